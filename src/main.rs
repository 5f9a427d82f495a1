//! Spriteflow CLI: fetch every listed sprite, decode it, observe it, delete the transient copy.

use anyhow::Result;
use clap::Parser;
use spriteflow::engine::arg_parser::Cli;
use spriteflow::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::info!("Total time: {:.2?}", start_time.elapsed());
    Ok(())
}
