/// Runs the overlay in the foreground until quit.
#[cfg(windows)]
pub fn execute() {
    if let Err(e) = overglass_windows::driver::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
pub fn execute() {
    eprintln!("The overlay requires Windows.");
    std::process::exit(1);
}
