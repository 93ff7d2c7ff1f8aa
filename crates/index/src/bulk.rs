//! Indexing of a fixed artifact list, widened with its multiplatform variants.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use exn::ResultExt;
use mvnx_extract::models::Artifact;
use mvnx_extract::parse_artifact_list;
use tokio::sync::Semaphore;
use tracing::instrument;

use crate::BULK_PARALLELISM;
use crate::bounded::for_each_bounded;
use crate::error::{ErrorKind, Result};
use crate::extractors::KmpTargetsExtractor;
use crate::indexer::IndexerHandle;
use crate::progress::{
    MultipleArtifactIndexer, Progress, ProgressStream, Reporter, SimpleProgress, Tally, progress_stream,
};

const STAGES: u32 = 3;

/// Indexes the artifacts listed in a CSV file, plus every Kotlin
/// Multiplatform variant found next to them.
///
/// Runs in three stages, each reported with [`Progress::Staged`]:
/// 1. Reading the list.
/// 2. Looking up variants. An artifact whose group can't be listed
///    contributes no variants and counts as an error.
/// 3. Indexing the union of listed artifacts and variants.
///
/// An unreadable or malformed list ends the run with an error.
#[derive(Clone)]
pub struct BulkListIndexer {
    source: PathBuf,
    kmp: KmpTargetsExtractor,
    indexer: IndexerHandle,
    parallelism: usize,
}

impl BulkListIndexer {
    pub fn new(source: impl Into<PathBuf>, kmp: KmpTargetsExtractor, indexer: IndexerHandle) -> Self {
        Self {
            source: source.into(),
            kmp,
            indexer,
            parallelism: BULK_PARALLELISM,
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    #[instrument(skip_all, fields(source = %self.source.display(), parallelism = self.parallelism))]
    async fn run(self, reporter: Reporter) -> Result<Progress> {
        let semaphore = Arc::new(Semaphore::new(self.parallelism));

        let stage = Stage::new(&reporter, "Reading artifacts from CSV", 1);
        stage.report(0, Some(1));
        let listed = self.read_list().await?;
        stage.report(1, Some(1));
        tracing::info!(artifacts = listed.len(), "Read artifact list");

        let stage = Stage::new(&reporter, "Extracting KMP variants", 2);
        let total = listed.len() as u64;
        stage.report(0, Some(total));
        let processed = Arc::new(AtomicU64::new(0));
        let tally = Arc::new(Tally::default());
        let variants = for_each_bounded(listed.iter().cloned(), &semaphore, |artifact| {
            let kmp = self.kmp.clone();
            let processed = Arc::clone(&processed);
            let tally = Arc::clone(&tally);
            let stage = stage.clone();
            async move {
                let variants = match kmp.variants(&artifact).await {
                    Ok(variants) => variants,
                    Err(err) => {
                        tracing::warn!(%artifact, error = %*err, "Could not look up multiplatform variants");
                        tally.error();
                        Vec::new()
                    },
                };
                stage.report(processed.fetch_add(1, Ordering::Relaxed) + 1, Some(total));
                variants
            }
        })
        .await?;
        let artifacts: BTreeSet<Artifact> = listed.into_iter().chain(variants.into_iter().flatten()).collect();

        let stage = Stage::new(&reporter, "Fetching versions", 3);
        let total = artifacts.len() as u64;
        stage.report(0, Some(total));
        for_each_bounded(artifacts, &semaphore, |artifact| {
            let indexer = Arc::clone(&self.indexer);
            let tally = Arc::clone(&tally);
            let stage = stage.clone();
            async move {
                match indexer.index_artifact(&artifact).await {
                    Ok(_) => stage.report(tally.success(), Some(total)),
                    Err(err) => {
                        tracing::warn!(%artifact, error = %*err, "Could not index artifact");
                        tally.error();
                    },
                }
            }
        })
        .await?;

        let result = tally.result();
        tracing::info!(?result, "Artifact list indexed");
        Ok(result)
    }

    async fn read_list(&self) -> Result<Vec<Artifact>> {
        let contents = tokio::fs::read(&self.source).await.or_raise(|| ErrorKind::Io)?;
        let source = self.source.display().to_string();
        parse_artifact_list(contents.as_slice(), &source).map_err(ErrorKind::extract)
    }
}

impl MultipleArtifactIndexer for BulkListIndexer {
    fn index(&self) -> ProgressStream {
        let indexer = self.clone();
        progress_stream(move |reporter| indexer.run(reporter))
    }
}

/// Reports progress within one stage of the run.
#[derive(Clone)]
struct Stage {
    reporter: Reporter,
    description: &'static str,
    stage: u32,
}

impl Stage {
    fn new(reporter: &Reporter, description: &'static str, stage: u32) -> Self {
        Self {
            reporter: reporter.clone(),
            description,
            stage,
        }
    }

    fn report(&self, current: u64, total: Option<u64>) {
        self.reporter.report(Progress::Staged {
            description: self.description,
            stage: self.stage,
            stage_total: Some(STAGES),
            progress: SimpleProgress::new(current, total),
        });
    }
}
