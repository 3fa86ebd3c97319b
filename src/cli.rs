use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Land planning CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "landplan", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full planning pipeline over a JSON job file
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Input job file: configuration plus boundary/exclusion rings
    #[arg(value_hint = ValueHint::FilePath)]
    pub job: PathBuf,

    /// Output report file (must be a file path; "-" is rejected)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Overwrite if the file exists
    #[arg(long)]
    pub force: bool,
}
