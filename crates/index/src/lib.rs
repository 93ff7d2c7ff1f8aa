//! Crawling and indexing engines.
//!
//! Every multi-artifact indexer ends in the same place: an
//! [`ArtifactIndexer`] that fetches one artifact's metadata and saves it.
//! - [`CrawlEngine`] walks a repository's directory listings breadth first
//!   and indexes every artifact directory it finds.
//! - [`BulkListIndexer`] indexes a fixed list of artifacts, plus any
//!   Kotlin Multiplatform variants sitting next to them.
//! - [`RefreshIndexer`] re-indexes everything already in the store.
//!
//! Each reports through a [`ProgressStream`] that ends with exactly one
//! [`Progress::Result`] (or an error, if the run couldn't continue at all).

mod bounded;
mod bulk;
mod crawl;
pub mod error;
mod extractors;
mod indexer;
mod progress;
mod refresh;

use std::time::Duration;

pub use crate::bulk::BulkListIndexer;
pub use crate::crawl::CrawlEngine;
pub use crate::extractors::{KmpTargetsExtractor, LinkExtractor, MetadataExtractor};
pub use crate::indexer::{ArtifactIndexer, IndexerHandle, SingleArtifactIndexer};
pub use crate::progress::{MultipleArtifactIndexer, Progress, ProgressStream, SimpleProgress};
pub use crate::refresh::RefreshIndexer;

/// Workers crawling directory listings at once.
pub const CRAWL_PARALLELISM: usize = 256;
/// Requests in flight while indexing an artifact list.
pub const BULK_PARALLELISM: usize = 64;
/// Requests in flight while refreshing stored artifacts.
pub const REFRESH_PARALLELISM: usize = 64;
/// Stored artifacts loaded into memory per refresh chunk.
pub const REFRESH_CHUNK_SIZE: u64 = 10_000;
/// How often a crawl checks whether it has run out of work.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
