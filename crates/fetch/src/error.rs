//! Fetch Error Types

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The HTTP client could not be constructed.
    #[display("could not build HTTP client")]
    Client,
    /// Connection failed, or the response body couldn't be read.
    #[display("network error fetching {_0}")]
    Network(#[error(not(source))] String),
    /// The request didn't complete in time.
    #[display("timed out fetching {_0}")]
    Timeout(#[error(not(source))] String),
    /// The server answered with a non-success status.
    #[display("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Client => false,
        }
    }
}
