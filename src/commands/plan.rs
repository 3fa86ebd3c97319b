use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::cli::PlanArgs;
use crate::config::PlanConfig;
use crate::pipeline;

/// On-disk job description: configuration plus site geometry, both optional
/// beyond the boundary rings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    #[serde(default)]
    config: PlanConfig,

    /// Site boundary rings as `[x, y]` sequences.
    boundaries: Vec<Vec<[f64; 2]>>,

    /// Water / unusable-land rings subtracted from the site.
    #[serde(default)]
    exclusion: Vec<Vec<[f64; 2]>>,
}

pub fn run(cli: &crate::cli::Cli, args: &PlanArgs) -> Result<()> {
    // Assert output path is not stdout
    if args.output == Path::new("-") {
        bail!("stdout is not supported.");
    }
    if args.output.exists() && !args.force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            args.output.display()
        );
    }

    if cli.verbose > 0 {
        eprintln!(
            "[plan] job={} -> {}",
            args.job.display(),
            args.output.display()
        );
    }

    let raw = fs::read_to_string(&args.job)
        .with_context(|| format!("reading job file {}", args.job.display()))?;
    let job: JobFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing job file {}", args.job.display()))?;

    let report = pipeline::run(&job.config, &job.boundaries, &job.exclusion)?;

    let out = serde_json::to_string_pretty(&report)?;
    fs::write(&args.output, out)
        .with_context(|| format!("writing report {}", args.output.display()))?;
    println!("Wrote plan -> {}", args.output.display());
    Ok(())
}
