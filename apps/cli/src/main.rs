//! assetdeploy entry point.

mod app;
mod cli;
mod config;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Logs go to stderr; stdout carries the export line and reports.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli::default_level(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting assetdeploy");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(cli))
}
