//! Version Ordering
//!
//! Maven places no constraints on version strings, so ordering is best-effort:
//! two strings that both look like semantic versions are compared by semantic
//! precedence, anything else falls back to plain byte-wise string ordering.

use semver::Version;
use std::cmp::Ordering;

/// Total order over version strings. See [`compare_versions`].
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionComparator;

impl VersionComparator {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }

    /// The greatest version in `versions`, if any.
    pub fn max<'a>(&self, versions: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
        versions.into_iter().max_by(|a, b| self.compare(a, b))
    }

    /// Sorts `versions` newest first.
    pub fn sort_descending<S: AsRef<str>>(&self, versions: &mut [S]) {
        versions.sort_by(|a, b| self.compare(b.as_ref(), a.as_ref()));
    }
}

/// Compares two version strings.
///
/// When both sides parse as semantic versions (leniently, so `1.0` is read as
/// `1.0.0`) they are ordered by semantic precedence, which ignores build
/// metadata. Otherwise the raw strings are compared lexicographically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(left), Some(right)) => left.cmp_precedence(&right),
        _ => a.cmp(b),
    }
}

fn parse_lenient(raw: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }
    // Pad a short numeric core (`1` or `1.2`) out to three components, keeping
    // any pre-release or build suffix as-is.
    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, suffix) = raw.split_at(split);
    let components: Vec<&str> = core.split('.').collect();
    if components.len() >= 3
        || components.iter().any(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let padded = format!("{core}{}{suffix}", ".0".repeat(3 - components.len()));
    Version::parse(&padded).ok()
}
