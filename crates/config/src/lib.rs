//! Layered configuration for mvnx.
//!
//! Sources, lowest priority first:
//! 1. compiled defaults,
//! 2. `config.toml` in the platform configuration directory, if present,
//! 3. an explicitly requested TOML file,
//! 4. `MVNX_`-prefixed environment variables, with `__` separating nested
//!    keys (`MVNX_INDEX__CRAWL_PARALLELISM=32`),
//! 5. `DB_PATH`, which sets the database location.

pub mod error;
mod models;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
pub use crate::models::{Config, HttpConfig, IndexConfig, RepositoryConfig, SearchConfig};

const APPLICATION: &str = "mvnx";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "MVNX_";
const DATABASE_ENV: &str = "DB_PATH";
const DATABASE_FILE: &str = "maven.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

/// Default database location: inside the platform data directory, or the
/// working directory when there is no home to speak of.
pub fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
}

/// Location of the implicitly loaded configuration file, if the platform has
/// a configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load and validate configuration from every source.
#[instrument]
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let config = layered(default_config_path().as_deref(), explicit)?
        .extract::<Config>()
        .or_raise(|| ErrorKind::Load)?
        .validate()?;
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}

fn layered(platform: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(path) = platform {
        // Missing files are skipped by `Toml::file`.
        figment = figment.merge(Toml::file(path));
    }
    if let Some(path) = explicit {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        figment = figment.merge(Toml::file_exact(path));
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    if let Ok(database) = std::env::var(DATABASE_ENV) {
        figment = figment.merge(Serialized::default("database", database));
    }
    Ok(figment)
}
