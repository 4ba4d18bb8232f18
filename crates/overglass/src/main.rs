mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "overglass",
    version,
    about = "A click-through web overlay that tracks a game window"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default configuration file
    Init,
    /// Run the overlay in the foreground
    Run,
    /// Resolve the target process once and print what was found
    Probe {
        /// Process image name to look for (e.g. "notepad.exe")
        #[arg(long, default_value = "")]
        process: String,
        /// Window title to look for, exact or substring
        #[arg(long, default_value = "")]
        title: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Run => commands::run::execute(),
        Commands::Probe { process, title } => commands::probe::execute(&process, &title),
    }
}
