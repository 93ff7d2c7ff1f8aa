//! # mvnx
//!
//! Crawls a Maven repository into a local SQLite index, then answers fuzzy
//! artifact searches, version listings and Kotlin Multiplatform target
//! lookups from it.
//!
//! ```bash
//! # Index everything under io.ktor, then search it
//! mvnx index-group io.ktor
//! mvnx search "ktor client"
//! mvnx versions io.ktor:ktor-client-core
//! ```

mod cli;
mod commands;
mod error;
mod render;

use std::process::ExitCode;

use clap::Parser;
use exn::ResultExt;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, LogLevel};
use crate::error::{ErrorKind, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = mvnx_config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    commands::run(config, cli.command).await
}

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
