//! Standalone errors file emitted next to each report.

use std::fs;
use std::path::Path;

use super::aggregate::ReportError;

/// Writes `errors.md`. An empty error list still produces the file so
/// downstream tooling can rely on its presence.
pub fn write_errors_markdown(path: &Path, errors: &[String]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = String::from("# Errors\n\n");
    if errors.is_empty() {
        out.push_str("None.\n");
    } else {
        for error in errors {
            out.push_str(&format!("- {error}\n"));
        }
    }
    fs::write(path, out)?;
    Ok(())
}
