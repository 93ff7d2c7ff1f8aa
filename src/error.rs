//! Command Error Types

use derive_more::{Display, Error};

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for commands.
pub type Result<T> = std::result::Result<T, Error>;

/// What stopped a command from completing.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the artifact index")]
    Store,
    #[display("could not set up the HTTP client")]
    Client,
    #[display("Error indexing {_0}")]
    Index(#[error(not(source))] String),
    #[display("could not write output")]
    Output,
}
