//! TorchMesh CLI - Command-line interface for Torchlight mesh tools

pub mod commands;
pub mod progress;

use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "torchmesh")]
#[command(about = "TorchMesh: OGRE mesh and skeleton tools for Torchlight", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Run the TorchMesh CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
