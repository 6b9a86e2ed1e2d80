#![recursion_limit = "256"]

mod cli;
mod application;
mod domain;
mod dsl;
mod data;
mod ml;
mod infra;

use anyhow::Result;
use cli::Cli;
use clap::Parser;

use infra::logging::init_tracing;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_verbosity());
    cli.run()
}
