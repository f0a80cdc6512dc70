//! `quill-cli` entry point.

use anyhow::Result;
use clap::Parser;
use quill_cli::{cli, commands};
use quill_runtime::{env_filter, CLI_LOG_FILTER};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(CLI_LOG_FILTER))
        .init();

    let cli = cli::Cli::parse();
    commands::run(cli)
}
