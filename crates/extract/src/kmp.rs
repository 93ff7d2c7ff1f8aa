//! Kotlin Multiplatform variant detection.
//!
//! A multiplatform library `foo` publishes one artifact per target platform,
//! named `foo-<target>` (`foo-jvm`, `foo-iosarm64`, ...). Detection is purely
//! name based.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::Artifact;

const PLATFORM_TARGETS: &[&str] = &["native", "common", "jvm", "android", "js", "jsir", "wasm", "wasmjs", "wasm32"];
const NATIVE_FAMILIES: &[&str] = &[
    "ios",
    "iossimulator",
    "androidnative",
    "linux",
    "mingw",
    "watchos",
    "macos",
    "tvos",
    "tvossimulator",
    "watchossimulator",
    "watchosdevice",
    "windows",
];
const NATIVE_ARCHITECTURES: &[&str] = &["arm64", "x64", "arm32", "arm32hfp", "x86", "mips32", "mipsel32"];

static KMP_TARGETS: LazyLock<HashSet<String>> = LazyLock::new(|| {
    let native = NATIVE_FAMILIES
        .iter()
        .flat_map(|family| NATIVE_ARCHITECTURES.iter().map(move |arch| format!("{family}{arch}")));
    PLATFORM_TARGETS.iter().map(|target| target.to_string()).chain(native).collect()
});

/// Every target suffix recognised as a multiplatform variant.
pub fn kmp_targets() -> impl Iterator<Item = &'static str> {
    KMP_TARGETS.iter().map(String::as_str)
}

/// Whether `candidate` (an artifact id, or a directory name with slashes) is
/// `original`'s artifact id followed by `-` and a known target, ignoring case.
pub fn is_kmp_variant_of(candidate: &str, original: &Artifact) -> bool {
    let candidate = candidate.trim_matches('/').to_lowercase();
    let prefix = format!("{}-", original.artifact_id.to_lowercase());
    candidate
        .strip_prefix(&prefix)
        .is_some_and(|suffix| KMP_TARGETS.contains(suffix))
}
