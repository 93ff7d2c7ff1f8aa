pub mod error;
mod http;
#[cfg(feature = "mock")]
mod mock;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
pub use crate::http::{FetchOptions, HttpFetcher};
#[cfg(feature = "mock")]
pub use crate::mock::MockFetcher;

pub type FetcherHandle = Arc<dyn Fetcher + Send + Sync>;

/// Retrieves the body of a repository page (directory listing or metadata
/// document) as text.
///
/// Implementations must be safe to call from many tasks at once; a crawl keeps
/// hundreds of requests in flight through a single shared handle.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, failing on anything other than a successful response.
    async fn get(&self, url: &str) -> Result<String>;
}
