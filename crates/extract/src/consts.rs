use regex::Regex;
use std::sync::LazyLock;

/// File name marking a directory as an artifact root.
pub const METADATA_FILE: &str = "maven-metadata.xml";
/// Directory listing entry pointing back up the tree.
pub const PARENT_DIRECTORY: &str = "../";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Only anchors count as links; `<div href="...">` and friends are ignored.
regex!(ANCHOR_HREF_REGEX, r#"<a\s+href="([^"]+)""#);
