//! lbprobe - load-balance verification harness
//!
//! Submits a batch of tasks to the scheduling service, records which
//! communication device each one lands on and reports how even the spread is.

use anyhow::Result;
use clap::Parser;

mod commands;
mod logging;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        lbprobe::error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
