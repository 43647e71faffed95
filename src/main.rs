//! # sheetflow command line
//!
//! ```bash
//! sheetflow operations
//! sheetflow check --pipeline clean.json --input data.csv
//! sheetflow preview --pipeline clean.json --input data.csv --rows 10
//! sheetflow run --pipeline clean.json --input data.csv --output cleaned.csv
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = cli::load_engine_config(cli.config.as_deref())?;
    // Listing the catalog writes no log file.
    if matches!(cli.command, cli::Commands::Operations) {
        sheetflow::logging::init_console(&config.log_level)?;
    } else {
        sheetflow::logging::init(&config)?;
    }
    cli::run_command(cli.command, config)
}
