//! Artifact list (CSV) parsing.

use std::io::Read;

use exn::ResultExt;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::models::Artifact;

const GROUP_COLUMN: &str = "namespace";
const ARTIFACT_COLUMN: &str = "name";

/// Reads artifacts from a CSV document with `namespace` and `name` columns.
///
/// Columns are located by header name, so their position and any extra
/// columns don't matter. Rows with a blank group or artifact are skipped.
/// `source` names the input in errors and logs.
///
/// # Errors
///
/// - [`ErrorKind::InvalidHeader`] if either column is missing (including an
///   entirely empty document).
/// - [`ErrorKind::Csv`] if the document can't be read as CSV.
#[instrument(skip(input))]
pub fn parse_artifact_list(input: impl Read, source: &str) -> Result<Vec<Artifact>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);
    let headers = reader.headers().or_raise(|| ErrorKind::Csv(source.to_string()))?;
    let group_column = headers.iter().position(|header| header == GROUP_COLUMN);
    let artifact_column = headers.iter().position(|header| header == ARTIFACT_COLUMN);
    let (Some(group_column), Some(artifact_column)) = (group_column, artifact_column) else {
        exn::bail!(ErrorKind::InvalidHeader(source.to_string()));
    };

    let mut artifacts = Vec::new();
    for record in reader.records() {
        let record = record.or_raise(|| ErrorKind::Csv(source.to_string()))?;
        let group_id = record.get(group_column).unwrap_or_default();
        let artifact_id = record.get(artifact_column).unwrap_or_default();
        if group_id.is_empty() || artifact_id.is_empty() {
            let line = record.position().map(|position| position.line()).unwrap_or_default();
            tracing::warn!(source, line, "Skipping artifact list row with a blank namespace or name");
            continue;
        }
        artifacts.push(Artifact::new(group_id, artifact_id));
    }
    Ok(artifacts)
}
