//! Re-indexing of everything already in the store.

use std::sync::Arc;

use exn::ResultExt;
use mvnx_cache::ArtifactStore;
use tokio::sync::Semaphore;
use tracing::instrument;

use crate::bounded::for_each_bounded;
use crate::error::{ErrorKind, Result};
use crate::indexer::IndexerHandle;
use crate::progress::{MultipleArtifactIndexer, Progress, ProgressStream, Reporter, Tally, progress_stream};
use crate::{REFRESH_CHUNK_SIZE, REFRESH_PARALLELISM};

/// Refreshes the versions of every stored artifact without crawling.
///
/// Artifacts are loaded a chunk at a time, in insertion order, so memory use
/// stays flat however large the store is. Artifacts saved while the run is in
/// progress may or may not be picked up.
#[derive(Clone)]
pub struct RefreshIndexer {
    store: Arc<ArtifactStore>,
    indexer: IndexerHandle,
    parallelism: usize,
    chunk_size: u64,
}

impl RefreshIndexer {
    pub fn new(store: Arc<ArtifactStore>, indexer: IndexerHandle) -> Self {
        Self {
            store,
            indexer,
            parallelism: REFRESH_PARALLELISM,
            chunk_size: REFRESH_CHUNK_SIZE,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[instrument(skip_all, fields(parallelism = self.parallelism, chunk_size = self.chunk_size))]
    async fn run(self, reporter: Reporter) -> Result<Progress> {
        let total = self.store.get_artifacts_count().await.or_raise(|| ErrorKind::Store)?;
        reporter.report(Progress::simple(0, Some(total)));
        tracing::info!(total, "Refreshing stored artifacts");

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let tally = Arc::new(Tally::default());
        for chunk in 0..total.div_ceil(self.chunk_size) {
            let artifacts = self
                .store
                .get_artifacts(self.chunk_size, chunk * self.chunk_size)
                .await
                .or_raise(|| ErrorKind::Store)?;
            tracing::debug!(chunk, artifacts = artifacts.len(), "Loaded chunk");
            for_each_bounded(artifacts, &semaphore, |artifact| {
                let indexer = Arc::clone(&self.indexer);
                let tally = Arc::clone(&tally);
                let reporter = reporter.clone();
                async move {
                    match indexer.index_artifact(&artifact).await {
                        Ok(_) => reporter.report(Progress::simple(tally.success(), Some(total))),
                        Err(err) => {
                            tracing::warn!(%artifact, error = %*err, "Could not refresh artifact");
                            tally.error();
                        },
                    }
                }
            })
            .await?;
        }

        let result = tally.result();
        tracing::info!(?result, "Refresh finished");
        Ok(result)
    }
}

impl MultipleArtifactIndexer for RefreshIndexer {
    fn index(&self) -> ProgressStream {
        let indexer = self.clone();
        progress_stream(move |reporter| indexer.run(reporter))
    }
}
