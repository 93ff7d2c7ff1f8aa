mod compare;
mod consts;
pub mod error;
mod kmp;
mod links;
mod list;
mod metadata;
pub mod models;

pub use crate::compare::{VersionComparator, compare_versions};
pub use crate::consts::{METADATA_FILE, PARENT_DIRECTORY};
pub use crate::kmp::{is_kmp_variant_of, kmp_targets};
pub use crate::links::parse_links;
pub use crate::list::parse_artifact_list;
pub use crate::metadata::parse_metadata;
