//! Schemax CLI: stream database metadata as JSON events; search it from
//! the terminal.

use anyhow::Result;
use clap::Parser;
use schemax::cli::{Cli, handle_run};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> Result<ExitCode> {
    let start_time = Instant::now();
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let code = handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(code)
}
