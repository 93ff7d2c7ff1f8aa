mod artifact;
mod versions;

pub use self::artifact::{Artifact, group_index_path};
pub use self::versions::{IndexedArtifact, VersionMetadata};
