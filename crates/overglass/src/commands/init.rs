use overglass_core::config;

/// Creates the default configuration file at `~/.config/overglass/`.
///
/// Generates `config.toml` with comments explaining every option.
/// An existing file is not overwritten.
pub fn execute() {
    let Some(dir) = config::config_dir() else {
        eprintln!("Error: could not determine home directory.");
        std::process::exit(1);
    };

    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Error: could not create {}: {e}", dir.display());
        std::process::exit(1);
    }

    let path = dir.join("config.toml");
    if path.exists() {
        println!("Already exists: {}", path.display());
        return;
    }

    match std::fs::write(&path, config::template()) {
        Ok(()) => {
            println!("Created {}", path.display());
            println!("\nSet [target] to the process or window title the overlay should track.");
        }
        Err(e) => eprintln!("Error: could not write {}: {e}", path.display()),
    }
}
