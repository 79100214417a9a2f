//! BLEnd CLI - Command-line driver for BLEnd neighbor discovery.
//!
//! Runs the epoch schedule over UDP beacons on the local network and reports
//! unique-neighbor counts per discovery window.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use cli::{Cli, Commands};
use error::{exit_codes, CliError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run(args) => commands::run_schedule(args, config, cli.json).await,
        Commands::Params(args) => commands::run_params(args, config, cli.json).await,
        Commands::Config(args) => commands::run_config(args, config, cli.json).await,
    }
}
