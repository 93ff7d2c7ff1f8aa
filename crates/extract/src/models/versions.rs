use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::compare::VersionComparator;

/// Published versions of an artifact, as described by its `maven-metadata.xml`.
///
/// When the document omits `<latest>` or `<release>`, both fall back to the
/// greatest listed version. An empty version list leaves both unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMetadata {
    pub versions: Vec<String>,
    pub latest_version: Option<String>,
    pub release_version: Option<String>,
}

impl VersionMetadata {
    pub fn new(versions: Vec<String>, latest_version: Option<String>, release_version: Option<String>) -> Self {
        Self {
            versions,
            latest_version,
            release_version,
        }
    }

    /// Builds metadata from the raw document contents, filling in any missing
    /// `latest`/`release` hint with the greatest listed version.
    pub fn resolve(versions: Vec<String>, latest_hint: Option<String>, release_hint: Option<String>) -> Self {
        let greatest = VersionComparator.max(versions.iter().map(String::as_str)).map(String::from);
        Self {
            latest_version: latest_hint.or_else(|| greatest.clone()),
            release_version: release_hint.or(greatest),
            versions,
        }
    }

    /// Label describing the flags a version carries, if any.
    pub fn annotation(&self, version: &str) -> Option<&'static str> {
        let latest = self.latest_version.as_deref() == Some(version);
        let release = self.release_version.as_deref() == Some(version);
        match (latest, release) {
            (true, true) => Some("latest, release"),
            (true, false) => Some("latest"),
            (false, true) => Some("release"),
            (false, false) => None,
        }
    }

    /// The listed versions, newest first.
    pub fn sorted_descending(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.versions.iter().map(String::as_str).collect();
        VersionComparator.sort_descending(&mut versions);
        versions
    }
}

/// Search result: an artifact together with its release version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Display for IndexedArtifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}
