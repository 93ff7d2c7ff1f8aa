//! In-memory fetcher for testing.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::Fetcher;
use crate::error::{ErrorKind, Result};

/// In-memory [`Fetcher`] for testing.
///
/// Serves pre-registered pages by exact URL. Unknown URLs answer with a 404
/// status, URLs marked as failing answer with a network error. Every request
/// is recorded so tests can assert on what was (and wasn't) fetched.
///
/// # Examples
///
/// ```
/// use mvnx_fetch::{Fetcher, MockFetcher};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = MockFetcher::with_pages([
///     ("https://repo.example/io/", r#"<a href="ktor/">ktor/</a>"#),
/// ]);
/// assert!(fetcher.get("https://repo.example/io/").await.is_ok());
/// assert!(fetcher.get("https://repo.example/com/").await.is_err());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn with_pages(pages: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            pages: pages.into_iter().map(|(url, body)| (url.into(), body.into())).collect(),
            ..Self::default()
        }
    }

    /// Register another page.
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    /// Make requests for `url` fail with a network error.
    pub fn with_failure(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Sleep before answering every request, to shake out ordering bugs.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every URL requested so far, in request order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        self.requests.lock().await.push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(url) {
            exn::bail!(ErrorKind::Network(url.to_string()));
        }
        match self.pages.get(url) {
            Some(body) => Ok(body.clone()),
            None => exn::bail!(ErrorKind::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_registered_pages() {
        let fetcher = MockFetcher::with_pages([("https://repo.example/a/", "listing")])
            .with_failure("https://repo.example/b/");
        assert_eq!(fetcher.get("https://repo.example/a/").await.unwrap(), "listing");

        let err = fetcher.get("https://repo.example/b/").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));

        let err = fetcher.get("https://repo.example/c/").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Status { status: 404, .. }));

        assert_eq!(
            fetcher.requests().await,
            vec!["https://repo.example/a/", "https://repo.example/b/", "https://repo.example/c/"]
        );
    }
}
