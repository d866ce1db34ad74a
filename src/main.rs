//! Repobook CLI: render a directory into PDF/EPUB/MOBI/HTML books.

use anyhow::Result;
use clap::Parser;
use repobook::engine::arg_parser::Cli;
use repobook::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
