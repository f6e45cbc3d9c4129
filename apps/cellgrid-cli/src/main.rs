mod app;
mod cli;
mod error;
mod logging;
mod stress;

use std::io;
use std::process;

use clap::Parser;
use tracing::error;

fn main() {
    let cli = cli::Cli::parse();

    if let Err(err) = logging::init(&cli.logging.to_config()) {
        eprintln!("❌ {}", error::CliError::from(err));
        process::exit(3);
    }

    let stdout = io::stdout();
    if let Err(err) = app::run(cli, &mut stdout.lock()) {
        error!(target: "cellgrid_cli", error = %err, "command failed");
        eprintln!("❌ {err}");
        process::exit(err.exit_code());
    }
}
