//! CLI wiring for the tuning collector.

use crate::collect::{run_collection, CollectOptions};
use crate::discovery::RUN_PREFIX;
use crate::selftest::run_selftest;
use anyhow::Result;
use clap::{Parser, Subcommand};
use smmtune_kernels::KernelRegistry;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "smmtune-collect",
    about = "Collect small-matmul tuning winners into a kernel parameter file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan tune_* directories and write the fastest valid kernel per shape.
    Collect {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, default_value = "parameters.txt")]
        output: PathBuf,
        /// Also write a JSON report listing unresolved and rejected shapes.
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long, default_value = RUN_PREFIX)]
        dir_prefix: String,
    },
    /// Run the built-in parsing and selection checks.
    Selftest,
}

impl Command {
    /// Options for `collect`; `None` for other subcommands.
    pub fn into_collect_options(self) -> Option<CollectOptions> {
        match self {
            Command::Collect {
                root,
                output,
                report,
                dir_prefix,
            } => Some(CollectOptions {
                root,
                output,
                report,
                dir_prefix,
            }),
            Command::Selftest => None,
        }
    }
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let registry = KernelRegistry::with_default_algorithms();
    let Cli { command } = cli;

    match command.into_collect_options() {
        Some(options) => {
            let report = run_collection(&options, registry)?;
            for problem in report.problems() {
                println!("- {}", problem);
            }
            if let Some(path) = &options.report {
                info!(path = %path.display(), "wrote collection report");
            }
            println!("Wrote {}", options.output.display());
        }
        None => {
            let cases = run_selftest(&registry)?;
            println!("selftest passed ({} cases)", cases);
        }
    }
    Ok(())
}
