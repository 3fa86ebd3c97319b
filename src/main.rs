use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use landplan::cli::{Cli, Commands};
use landplan::commands::plan;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Plan(args) => plan::run(&cli, args),
    }
}
