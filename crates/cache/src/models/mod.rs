//! Row types and their conversions to the shared model.

use mvnx_extract::models::{Artifact, IndexedArtifact, VersionMetadata};

/// Versions are stored in a `VARCHAR(100)` column.
pub(crate) const MAX_VERSION_CHARS: usize = 100;

pub(crate) fn truncate_version(version: &str) -> String {
    version.chars().take(MAX_VERSION_CHARS).collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct ArtifactRow {
    group_id: String,
    artifact_id: String,
}
impl From<ArtifactRow> for Artifact {
    fn from(row: ArtifactRow) -> Self {
        Artifact::new(row.group_id, row.artifact_id)
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SearchRow {
    group_id: String,
    artifact_id: String,
    version: String,
}
impl From<SearchRow> for IndexedArtifact {
    fn from(row: SearchRow) -> Self {
        IndexedArtifact {
            group_id: row.group_id,
            artifact_id: row.artifact_id,
            version: row.version,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct VersionRow {
    version: String,
    is_latest: bool,
    is_release: bool,
}

/// Folds an artifact's version rows back into [`VersionMetadata`].
pub(crate) fn collect_versions(rows: Vec<VersionRow>) -> VersionMetadata {
    let mut metadata = VersionMetadata::default();
    for row in rows {
        if row.is_latest {
            metadata.latest_version = Some(row.version.clone());
        }
        if row.is_release {
            metadata.release_version = Some(row.version.clone());
        }
        metadata.versions.push(row.version);
    }
    metadata
}
