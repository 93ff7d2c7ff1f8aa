//! SQLite store for indexed Maven artifacts.
//!
//! The store is a local, rebuildable index of a remote repository: the remote
//! repository is the source of truth, and deleting the database only means
//! crawling again.
//!
//! # Architecture
//! - **Artifacts**: one row per `(group_id, artifact_id)`, with a stable
//!   integer key used for pagination.
//! - **Versions**: every version string ever seen for an artifact. Rows are
//!   only ever added; at most one per artifact is flagged latest, and at most
//!   one release.
//! - **Fuzzy index**: an FTS5 trigram table holding a normalized copy of each
//!   artifact's coordinates, keyed by the artifact row id.

mod db;
pub mod error;
mod models;
mod search;
mod store;

pub use crate::db::Database;
pub use crate::store::ArtifactStore;
