use serde::{Deserialize, Serialize};

/// One `<package id=".." version=".." />` entry from a manifest.
///
/// Identity is `id`; matching ignores case while output keeps the original spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    pub id: String,
    pub version: String,
}

impl DependencyDeclaration {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Case-insensitive identity comparison.
    pub fn same_identity(&self, other: &str) -> bool {
        self.id.to_lowercase() == other.to_lowercase()
    }
}
