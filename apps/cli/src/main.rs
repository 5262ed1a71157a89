//! TenderScan CLI: extract tender documents into a tabular store.
//!
//! Reads table grids from each document in an input directory, normalizes
//! them into one record per tender, and appends new tenders to a CSV file
//! or a libSQL database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
