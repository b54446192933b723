//! Label-based ownership checks for destructive operations.
//!
//! Delete never trusts resource IDs alone. A resource is only considered
//! managed when its labels carry every required ownership pair, so a
//! hand-made resource that happens to share an ID is left untouched.

use std::collections::BTreeMap;

/// The label pairs a live resource must carry to be considered managed.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnershipFilter {
    /// Required label pairs. A candidate must match all of them.
    pub required: BTreeMap<String, String>,
}

impl OwnershipFilter {
    /// Builds a filter requiring exactly the given pairs.
    pub fn new(required: BTreeMap<String, String>) -> Self {
        Self { required }
    }

    /// Superset match: every required pair must be present with an equal
    /// value. A candidate with no labels at all is never owned.
    pub fn is_owned_by(&self, candidate: &BTreeMap<String, String>) -> bool {
        if candidate.is_empty() {
            return false;
        }
        self.required
            .iter()
            .all(|(key, value)| candidate.get(key) == Some(value))
    }
}
