use std::time::Duration;

use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use tracing::instrument;

use crate::Fetcher;
use crate::error::{ErrorKind, Result};

/// Connection settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Extra attempts made after a retryable failure.
    pub retries: u32,
    /// Delay before the first retry; doubles on every further attempt.
    pub backoff: Duration,
}
impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            retries: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

/// [`Fetcher`] over HTTP(S), sharing one connection pool across all callers.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self {
            client,
            retries: options.retries,
            backoff: options.backoff,
        })
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return Err(err).or_raise(|| ErrorKind::Timeout(url.to_string())),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Network(url.to_string())),
        };
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.or_raise(|| ErrorKind::Network(url.to_string()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) if attempt < self.retries && err.is_retryable() => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::debug!(attempt, delay_ms = delay.as_millis(), error = %*err, "Retrying request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }
}
