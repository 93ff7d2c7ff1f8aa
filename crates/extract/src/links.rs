use crate::consts::{ANCHOR_HREF_REGEX, PARENT_DIRECTORY};

/// Extracts the `href` targets of every anchor in a directory listing, in
/// document order, skipping the parent-directory link.
pub fn parse_links(html: &str) -> Vec<String> {
    ANCHOR_HREF_REGEX
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .map(|href| href.as_str())
        .filter(|href| *href != PARENT_DIRECTORY)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_anchor_targets_in_order() {
        let html = r#"<html><body>
            <a href="../">../</a>
            <a href="ktor-client-core/">ktor-client-core/</a>
            <a href="ktor-client-core-jvm/">ktor-client-core-jvm/</a>
            <a href="maven-metadata.xml">maven-metadata.xml</a>
        </body></html>"#;
        assert_eq!(
            parse_links(html),
            vec!["ktor-client-core/", "ktor-client-core-jvm/", "maven-metadata.xml"]
        );
    }

    #[test]
    fn ignores_non_anchor_hrefs() {
        let html = r#"<div href="nope/"></div><link href="style.css"><a href="yes/">yes</a>"#;
        assert_eq!(parse_links(html), vec!["yes/"]);
    }

    #[test]
    fn empty_listing_has_no_links() {
        assert!(parse_links("").is_empty());
        assert!(parse_links("<html><body><a href=\"../\">../</a></body></html>").is_empty());
    }
}
