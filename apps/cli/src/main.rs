//! cvtailor CLI: tailor a résumé to a job posting without inventing anything.
//!
//! Parses the résumé, analyzes the posting, then drafts, reviews and audits
//! until a draft passes or the write budget runs out.

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
