/// Resolves the given patterns once and prints the outcome.
///
/// With no arguments, probes the target configured in `config.toml`.
#[cfg(windows)]
pub fn execute(process: &str, title: &str) {
    use overglass_core::process::{ProcessMonitor, ProcessState};
    use overglass_windows::Win32Resolver;

    let (process, title) = if process.is_empty() && title.is_empty() {
        let config = overglass_core::config::load();
        (config.target.process, config.target.title)
    } else {
        (process.to_string(), title.to_string())
    };

    if process.is_empty() && title.is_empty() {
        eprintln!("Nothing to probe: pass --process/--title or configure [target].");
        std::process::exit(1);
    }

    let monitor = ProcessMonitor::new(Win32Resolver, std::time::Duration::from_millis(500));
    let info = monitor.find_process(&process, &title);

    match info.state {
        ProcessState::Running => {
            println!("Found: {} (pid {})", info.name, info.process_id);
            if info.window != 0 {
                println!("  window  0x{:X} \"{}\"", info.window, info.title);
                println!(
                    "  bounds  {},{} {}x{}",
                    info.bounds.x, info.bounds.y, info.bounds.width, info.bounds.height
                );
                println!("  focus   {}", info.has_focus);
                println!("  state   {}", if info.is_minimized { "minimized" } else { "normal" });
            } else {
                println!("  process is running but has no visible window");
            }
        }
        _ => {
            println!("Not found: process '{process}' title '{title}'");
        }
    }
}

#[cfg(not(windows))]
pub fn execute(_process: &str, _title: &str) {
    eprintln!("Probing requires Windows.");
    std::process::exit(1);
}
