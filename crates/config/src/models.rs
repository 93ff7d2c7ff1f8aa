use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

const DEFAULT_HOST: &str = "https://repo.maven.apache.org/maven2/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file holding the index.
    pub database: PathBuf,
    pub repository: RepositoryConfig,
    pub http: HttpConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            database: crate::default_database_path(),
            repository: RepositoryConfig::default(),
            http: HttpConfig::default(),
            index: IndexConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Root of the Maven repository; always ends in `/` once validated.
    pub host: String,
}
impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Extra attempts after a retryable failure.
    pub retries: u32,
    /// Delay before the first retry, doubled for each one after.
    pub backoff_millis: u64,
}
impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            retries: 3,
            backoff_millis: 250,
        }
    }
}
impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Workers crawling directory listings.
    pub crawl_parallelism: usize,
    /// Concurrent requests while indexing an artifact list.
    pub bulk_parallelism: usize,
    /// Concurrent requests while refreshing stored artifacts.
    pub refresh_parallelism: usize,
    /// Stored artifacts loaded per refresh chunk.
    pub refresh_chunk_size: u64,
    /// How often the crawl checks whether it has run out of work.
    pub poll_interval_millis: u64,
}
impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            crawl_parallelism: 256,
            bulk_parallelism: 64,
            refresh_parallelism: 64,
            refresh_chunk_size: 10_000,
            poll_interval_millis: 1_000,
        }
    }
}
impl IndexConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of search results shown.
    pub limit: u32,
}
impl Default for SearchConfig {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

impl Config {
    /// Check value ranges and normalize the repository host.
    pub fn validate(mut self) -> Result<Self> {
        let positive = [
            ("index.crawl_parallelism", self.index.crawl_parallelism as u64),
            ("index.bulk_parallelism", self.index.bulk_parallelism as u64),
            ("index.refresh_parallelism", self.index.refresh_parallelism as u64),
            ("index.refresh_chunk_size", self.index.refresh_chunk_size),
            ("index.poll_interval_millis", self.index.poll_interval_millis),
            ("http.connect_timeout_secs", self.http.connect_timeout_secs),
            ("http.request_timeout_secs", self.http.request_timeout_secs),
            ("search.limit", u64::from(self.search.limit)),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            exn::bail!(ErrorKind::InvalidValue(field));
        }
        let host = self.repository.host.trim();
        if host.is_empty() {
            exn::bail!(ErrorKind::InvalidValue("repository.host"));
        }
        self.repository.host = if host.ends_with('/') {
            host.to_string()
        } else {
            format!("{host}/")
        };
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://maven.google.com", "https://maven.google.com/")]
    #[case("https://repo.maven.apache.org/maven2/", "https://repo.maven.apache.org/maven2/")]
    #[case(" https://repo1.example/maven ", "https://repo1.example/maven/")]
    fn normalizes_host(#[case] host: &str, #[case] expected: &str) {
        let mut config = Config::default();
        config.repository.host = host.to_string();
        assert_eq!(config.validate().unwrap().repository.host, expected);
    }

    #[test]
    fn rejects_empty_host() {
        let mut config = Config::default();
        config.repository.host = "   ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidValue("repository.host")));
    }

    #[test]
    fn rejects_zero_parallelism() {
        let mut config = Config::default();
        config.index.crawl_parallelism = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidValue("index.crawl_parallelism")));
    }
}
