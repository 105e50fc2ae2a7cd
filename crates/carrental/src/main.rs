//! `carrent` - CLI for carrental
//!
//! This binary manages the fleet, bookings and payments of a car rental
//! business from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;

use carrental::app::{config_command, App};
use carrental::cli::{Cli, Command};
use carrental::{init_logging, Config};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Configuration commands never touch the store
    if let Command::Config(cmd) = cli.command {
        print_output(&config_command(&config, cmd)?);
        return Ok(());
    }

    let mut app = App::open(config).await?;
    let output = app.execute(cli.command).await?;
    print_output(&output);
    Ok(())
}

fn print_output(output: &str) {
    let output = output.trim_end();
    if !output.is_empty() {
        println!("{output}");
    }
}
