//! Fetch-and-parse collaborators: each one turns a repository location into
//! data, and holds no state beyond the shared fetcher.

use exn::ResultExt;
use mvnx_extract::models::{Artifact, VersionMetadata};
use mvnx_extract::{is_kmp_variant_of, parse_links, parse_metadata};
use mvnx_fetch::FetcherHandle;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Lists the links of a directory listing page.
#[derive(Clone)]
pub struct LinkExtractor {
    fetcher: FetcherHandle,
}

impl LinkExtractor {
    pub fn new(fetcher: FetcherHandle) -> Self {
        Self { fetcher }
    }

    /// Anchor targets on the page at `url`, in document order, without the
    /// parent-directory link.
    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> Result<Vec<String>> {
        let html = self.fetcher.get(url).await.or_raise(|| ErrorKind::Fetch)?;
        Ok(parse_links(&html))
    }
}

/// Reads an artifact's `maven-metadata.xml`.
#[derive(Clone)]
pub struct MetadataExtractor {
    fetcher: FetcherHandle,
    host: String,
}

impl MetadataExtractor {
    /// `host` is the repository root and must end in `/`.
    pub fn new(fetcher: FetcherHandle, host: impl Into<String>) -> Self {
        Self {
            fetcher,
            host: host.into(),
        }
    }

    #[instrument(skip(self), fields(artifact = %artifact))]
    pub async fn extract(&self, artifact: &Artifact) -> Result<VersionMetadata> {
        let xml = self
            .fetcher
            .get(&artifact.metadata_url(&self.host))
            .await
            .or_raise(|| ErrorKind::Fetch)?;
        parse_metadata(&xml).map_err(ErrorKind::extract)
    }
}

/// Finds the Kotlin Multiplatform variants published next to an artifact.
///
/// Variants are recognised by name alone (see [`is_kmp_variant_of`]): an
/// unlisted target suffix is missed, and an unrelated artifact that happens
/// to be named like a variant is included.
#[derive(Clone)]
pub struct KmpTargetsExtractor {
    links: LinkExtractor,
    host: String,
}

impl KmpTargetsExtractor {
    /// `host` is the repository root and must end in `/`.
    pub fn new(links: LinkExtractor, host: impl Into<String>) -> Self {
        Self {
            links,
            host: host.into(),
        }
    }

    /// Variants of `artifact` listed in its group directory, not including
    /// `artifact` itself.
    #[instrument(skip(self), fields(artifact = %artifact))]
    pub async fn variants(&self, artifact: &Artifact) -> Result<Vec<Artifact>> {
        let links = self.links.extract(&artifact.group_url(&self.host)).await?;
        Ok(links
            .iter()
            .filter(|link| is_kmp_variant_of(link, artifact))
            .map(|link| Artifact::new(artifact.group_id.clone(), link.trim_matches('/')))
            .collect())
    }
}
