use serde::{Deserialize, Serialize};

/// Per-item result of a single manifest migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub manifest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_file: Option<String>,

    pub status: ItemStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Number of declarations inserted.
    #[serde(default)]
    pub dependencies: u64,

    #[serde(default)]
    pub removed: RemovalCounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileChange>,

    /// Unified diff of the build file; only filled for dry runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

impl ItemOutcome {
    pub fn failed(
        manifest: impl Into<String>,
        build_file: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            manifest: manifest.into(),
            build_file,
            status: ItemStatus::Failed,
            message: Some(message.into()),
            dependencies: 0,
            removed: RemovalCounts::default(),
            warnings: vec![],
            files: vec![],
            patch: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != ItemStatus::Failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Migrated,
    DryRun,
    Failed,
}

/// How many nodes of each legacy class a migration removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalCounts {
    pub references: u64,
    pub errors: u64,
    pub imports: u64,
    pub none_include: bool,
    pub ensure_imports_target: bool,
}

impl RemovalCounts {
    pub fn total(&self) -> u64 {
        self.references
            + self.errors
            + self.imports
            + u64::from(self.none_include)
            + u64::from(self.ensure_imports_target)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub sha256_before: String,
    pub sha256_after: String,
    pub bytes_before: u64,
    pub bytes_after: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}
