//! Leveret binary.
//!
//! This binary provides the command-line entry point for training and
//! scoring online learning models through the leveret session layer.

use clap::Parser;
use leveret_core::cli::{handle_predict, handle_train, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("leveret_core=info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Train(cmd) => handle_train(cmd)?,
        Commands::Predict(cmd) => handle_predict(cmd)?,
    }

    Ok(())
}
