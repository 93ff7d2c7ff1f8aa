//! Parsing Error Types
//!
//! Everything in this crate is pure: a document either parses or it doesn't,
//! so none of these errors are worth retrying.

use derive_more::{Display, Error};

/// A parsing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The metadata document is not well-formed XML.
    #[display("malformed metadata XML: {_0}")]
    MalformedXml(#[error(not(source))] String),
    /// The metadata document is well-formed but has no `<versions>` list.
    #[display("metadata document has no versions list")]
    MissingVersions,
    /// The artifact list does not carry the required columns.
    #[display("Invalid file format: {_0}. It should have headers named 'namespace' and 'name'.")]
    InvalidHeader(#[error(not(source))] String),
    /// The artifact list could not be read as CSV.
    #[display("unreadable artifact list: {_0}")]
    Csv(#[error(not(source))] String),
    /// A coordinate string could not be turned into an artifact.
    #[display("Artifact should be specified in a format: foo.bar:xyz or foo.bar.xyz:1.2.3 (found '{_0}')")]
    InvalidCoordinates(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
