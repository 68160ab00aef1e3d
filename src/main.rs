//! Binary entry point for the scorecast CLI.

use clap::Parser;
use scorecast::cli::{cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scorecast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            artifacts,
            test_fraction,
            folds,
            threshold,
            seed,
        } => {
            cmd_train(&data, &artifacts, test_fraction, folds, threshold, seed)?;
        }
        Commands::Predict { artifacts, record } => {
            cmd_predict(&artifacts, record.as_deref())?;
        }
    }

    Ok(())
}
