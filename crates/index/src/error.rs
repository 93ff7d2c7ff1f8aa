//! Indexing Error Types
//!
//! Per-URL and per-artifact failures inside a multi-artifact run are counted,
//! not raised; these only reach callers of one-shot operations, or end a run
//! that can't continue at all (unreadable artifact list, unavailable store).

use derive_more::{Display, Error};
use mvnx_extract::error::{Error as ExtractError, ErrorKind as ExtractErrorKind};

/// An indexing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for indexing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an indexing failure.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A repository page couldn't be retrieved.
    #[display("could not fetch repository page")]
    Fetch,
    /// A repository document couldn't be understood.
    #[display("could not parse repository document")]
    Parse,
    /// An artifact list or coordinate has the wrong shape.
    #[display("invalid input format")]
    Format,
    /// The artifact list couldn't be read from disk.
    #[display("could not read artifact list")]
    Io,
    /// The artifact store rejected a read or write.
    #[display("artifact store failure")]
    Store,
    /// A background task panicked or was cancelled before finishing.
    #[display("indexing task was interrupted")]
    Interrupted,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch)
    }

    /// Wrap a parser error, keeping malformed input and malformed documents
    /// apart.
    #[track_caller]
    pub(crate) fn extract(err: ExtractError) -> Error {
        let kind = match &*err {
            ExtractErrorKind::InvalidHeader(_) | ExtractErrorKind::InvalidCoordinates(_) => Self::Format,
            ExtractErrorKind::MalformedXml(_) | ExtractErrorKind::MissingVersions | ExtractErrorKind::Csv(_) => {
                Self::Parse
            },
        };
        err.raise(kind)
    }
}
