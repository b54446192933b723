//! JSON output for analysis and aggregate results.

use std::fs;
use std::path::Path;

use serde::Serialize;

use super::aggregate::ReportError;

/// Writes `value` as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut body = serde_json::to_string_pretty(value).map_err(|source| ReportError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    body.push('\n');
    fs::write(path, body)?;
    Ok(())
}
