use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mvnx_extract::models::Artifact;

#[derive(Debug, Clone, Parser)]
#[command(name = "mvnx")]
#[command(about = "Index a Maven repository locally and search it")]
#[command(version)]
pub struct Cli {
    /// Configuration file, read on top of the platform default one.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Minimum level of log messages written to stderr. `RUST_LOG` takes
    /// precedence when set.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Crawl the whole repository.
    Index,
    /// Crawl a single group, e.g. `io.ktor`.
    IndexGroup { group: String },
    /// Index one artifact, given as `group:artifact`.
    IndexArtifact {
        #[arg(value_parser = parse_artifact)]
        artifact: Artifact,
    },
    /// Index the artifacts listed in a CSV file with `namespace` and `name`
    /// columns, plus their Kotlin Multiplatform variants.
    IndexCsv {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Refresh the versions of every indexed artifact.
    Refresh,
    /// Fuzzy search indexed artifacts.
    Search {
        query: String,
        /// Maximum number of results (defaults to `search.limit`).
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// List the indexed Kotlin Multiplatform targets of an artifact.
    Targets {
        #[arg(value_parser = parse_artifact)]
        artifact: Artifact,
    },
    /// List the indexed versions of an artifact, newest first.
    Versions {
        #[arg(value_parser = parse_artifact)]
        artifact: Artifact,
    },
}

fn parse_artifact(value: &str) -> Result<Artifact, String> {
    value.parse::<Artifact>().map_err(|err| (*err).to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}
