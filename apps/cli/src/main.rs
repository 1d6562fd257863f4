//! feedcollector CLI: keeps a deduplicated archive of links from a feed.
//!
//! Each run reads the feed, resolves new links to their canonical URL and
//! page title, merges them into a JSON collection and renders Markdown pages.

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
