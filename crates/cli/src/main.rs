//! `smmtune-collect` executable.

use anyhow::Result;
use clap::Parser;
use smmtune_collector::cli::{run_cli, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli)
}
