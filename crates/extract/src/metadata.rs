//! `maven-metadata.xml` parsing.

use exn::ResultExt;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::models::VersionMetadata;

const VERSIONS: &[u8] = b"versions";
const VERSION: &[u8] = b"version";
const LATEST: &[u8] = b"latest";
const RELEASE: &[u8] = b"release";

/// Extracts the version list and the `latest`/`release` hints from an
/// artifact's metadata document.
///
/// Only `<version>` elements directly inside a `<versions>` element are
/// counted, wherever that element sits in the document. Missing hints fall
/// back to the greatest listed version (see [`VersionMetadata::resolve`]).
///
/// # Errors
///
/// - [`ErrorKind::MalformedXml`] if the document isn't well-formed.
/// - [`ErrorKind::MissingVersions`] if it has no `<versions>` element at all.
#[instrument(skip(xml), fields(xml_size = xml.len()))]
pub fn parse_metadata(xml: &str) -> Result<VersionMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut has_root = false;
    let mut has_versions = false;
    let mut versions = Vec::new();
    let mut latest = None;
    let mut release = None;

    loop {
        let event = reader
            .read_event()
            .or_raise(|| ErrorKind::MalformedXml(format!("invalid syntax near byte {}", reader.buffer_position())))?;
        let text = match event {
            Event::Start(element) => {
                has_root = true;
                has_versions |= element.local_name().as_ref() == VERSIONS;
                open.push(element.local_name().as_ref().to_vec());
                continue;
            },
            Event::Empty(element) => {
                has_root = true;
                has_versions |= element.local_name().as_ref() == VERSIONS;
                continue;
            },
            Event::End(_) => {
                open.pop();
                continue;
            },
            Event::Text(text) => text
                .unescape()
                .or_raise(|| ErrorKind::MalformedXml("invalid character reference".to_string()))?
                .into_owned(),
            Event::CData(data) => String::from_utf8_lossy(&data.into_inner()).into_owned(),
            Event::Eof => break,
            _ => continue,
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match open.as_slice() {
            [.., parent, element] if parent == VERSIONS && element == VERSION => versions.push(text.to_string()),
            [.., element] if element == LATEST => latest = Some(text.to_string()),
            [.., element] if element == RELEASE => release = Some(text.to_string()),
            _ => {},
        }
    }

    if let Some(unclosed) = open.last() {
        exn::bail!(ErrorKind::MalformedXml(format!(
            "unclosed element <{}>",
            String::from_utf8_lossy(unclosed)
        )));
    }
    if !has_root {
        exn::bail!(ErrorKind::MalformedXml("no root element".to_string()));
    }
    if !has_versions {
        exn::bail!(ErrorKind::MissingVersions);
    }
    Ok(VersionMetadata::resolve(versions, latest, release))
}
