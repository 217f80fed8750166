//! formscribe CLI: generate issue content and distribute it over form fields.
//!
//! Works on HTML pages saved to disk: every page-mutating command writes the
//! updated document back out.

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
