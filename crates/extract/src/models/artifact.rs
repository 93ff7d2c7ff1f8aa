use std::{
    cmp::Ordering,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::consts::METADATA_FILE;
use crate::error::{Error, ErrorKind};

/// A Maven coordinate without a version: `group_id:artifact_id`.
///
/// Identity is the pair of strings, compared exactly. Ordering follows the
/// textual form `"{group_id}:{artifact_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
}

impl Artifact {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Derives an artifact from its directory path inside a repository.
    ///
    /// The last path segment is the artifact id and every segment before it
    /// makes up the dotted group id. Paths with fewer than two segments don't
    /// describe an artifact.
    pub fn from_repository_path(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let (artifact_id, group) = segments.split_last()?;
        if group.is_empty() {
            return None;
        }
        Some(Self::new(group.join("."), *artifact_id))
    }

    /// The group id as a repository path, e.g. `io/ktor`.
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// The artifact directory, relative to the repository root, e.g.
    /// `io/ktor/ktor-client-core`.
    pub fn url_path(&self) -> String {
        format!("{}/{}", self.group_path(), self.artifact_id)
    }

    /// Location of `maven-metadata.xml` for this artifact under `host`, which
    /// is expected to end in `/`.
    pub fn metadata_url(&self, host: &str) -> String {
        format!("{host}{}/{METADATA_FILE}", self.url_path())
    }

    /// Location of the directory listing for this artifact's group.
    pub fn group_url(&self, host: &str) -> String {
        format!("{host}{}", group_index_path(&self.group_id))
    }
}

/// The directory listing a group's artifacts, relative to the repository
/// root, e.g. `io/ktor/` for `io.ktor`.
pub fn group_index_path(group_id: &str) -> String {
    let path = group_id.trim_matches('.').replace('.', "/");
    if path.is_empty() { path } else { format!("{path}/") }
}

impl Display for Artifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl Ord for Artifact {
    fn cmp(&self, other: &Self) -> Ordering {
        // Byte-for-byte the same as comparing the two `Display` strings, without
        // allocating them.
        let left = self.group_id.bytes().chain(std::iter::once(b':')).chain(self.artifact_id.bytes());
        let right = other.group_id.bytes().chain(std::iter::once(b':')).chain(other.artifact_id.bytes());
        left.cmp(right)
    }
}
impl PartialOrd for Artifact {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Artifact {
    type Err = Error;

    /// Parses `group:artifact`, ignoring any further `:version` (or other)
    /// components.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':').map(str::trim);
        match (parts.next(), parts.next()) {
            (Some(group), Some(artifact)) if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(group, artifact))
            },
            _ => exn::bail!(ErrorKind::InvalidCoordinates(s.to_string())),
        }
    }
}
