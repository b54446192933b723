//! Parsing for the `--labels key=value,key=value` flag.

use std::collections::BTreeMap;

use thiserror::Error;

/// Error for a malformed label pair.
#[derive(Debug, Error)]
#[error("invalid label {0:?}")]
pub struct LabelError(pub String);

/// Parses a comma-separated list of `key=value` pairs. An empty input yields
/// an empty map.
pub fn parse_labels(input: &str) -> Result<BTreeMap<String, String>, LabelError> {
    let mut labels = BTreeMap::new();
    if input.trim().is_empty() {
        return Ok(labels);
    }
    for pair in input.split(',') {
        let trimmed = pair.trim();
        match trimmed.split_once('=') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => {
                labels.insert(key.to_string(), value.to_string());
            }
            _ => return Err(LabelError(pair.to_string())),
        }
    }
    Ok(labels)
}
