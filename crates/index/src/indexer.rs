use std::sync::Arc;

use async_trait::async_trait;
use exn::ResultExt;
use mvnx_cache::ArtifactStore;
use mvnx_extract::models::{Artifact, VersionMetadata};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::extractors::MetadataExtractor;

pub type IndexerHandle = Arc<dyn ArtifactIndexer + Send + Sync>;

/// Brings one artifact's entry in the store up to date.
#[async_trait]
pub trait ArtifactIndexer: Send + Sync {
    /// Fetch the artifact's current versions and save them, returning what
    /// was saved.
    async fn index_artifact(&self, artifact: &Artifact) -> Result<VersionMetadata>;
}

/// Indexes an artifact straight from its `maven-metadata.xml`.
pub struct SingleArtifactIndexer {
    metadata: MetadataExtractor,
    store: Arc<ArtifactStore>,
}

impl SingleArtifactIndexer {
    pub fn new(metadata: MetadataExtractor, store: Arc<ArtifactStore>) -> Self {
        Self { metadata, store }
    }
}

#[async_trait]
impl ArtifactIndexer for SingleArtifactIndexer {
    #[instrument(skip(self), fields(artifact = %artifact))]
    async fn index_artifact(&self, artifact: &Artifact) -> Result<VersionMetadata> {
        let metadata = self.metadata.extract(artifact).await?;
        self.store
            .save_artifact(artifact, &metadata)
            .await
            .or_raise(|| ErrorKind::Store)?;
        tracing::debug!(versions = metadata.versions.len(), "Indexed artifact");
        Ok(metadata)
    }
}
