//! Fuzzy search text handling.
//!
//! Both the indexed coordinates and the search query are reduced to lowercase
//! alphanumerics, so `io.ktor:ktor-client` and `KtorClient` share trigrams.

use std::collections::HashSet;

const TRIGRAM: usize = 3;

pub(crate) fn normalize(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

/// FTS5 query matching any trigram of the normalized `query`, or `None` if
/// the query is too short to contain a single trigram.
pub(crate) fn trigram_query(query: &str) -> Option<String> {
    let chars: Vec<char> = normalize(query).chars().collect();
    let mut seen = HashSet::new();
    let terms: Vec<String> = chars
        .windows(TRIGRAM)
        .map(|window| window.iter().collect::<String>())
        .filter(|trigram| seen.insert(trigram.clone()))
        // Normalized text never contains quotes, so quoting can't be escaped.
        .map(|trigram| format!("\"{trigram}\""))
        .collect();
    (!terms.is_empty()).then(|| terms.join(" OR "))
}

/// `LIKE` pattern matching every string starting with `prefix`, literally.
pub(crate) fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("com.trigram", "comtrigram")]
    #[case("Ktor-Client_Core", "ktorclientcore")]
    #[case("  ", "")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("rchli", Some(r#""rch" OR "chl" OR "hli""#))]
    #[case("R-C-H", Some(r#""rch""#))]
    #[case("aaaa", Some(r#""aaa""#))]
    #[case("ab", None)]
    #[case("..", None)]
    fn builds_trigram_queries(#[case] query: &str, #[case] expected: Option<&str>) {
        assert_eq!(trigram_query(query).as_deref(), expected);
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(like_prefix("ktor"), "ktor%");
        assert_eq!(like_prefix("my_lib%"), r"my\_lib\%%");
    }
}
