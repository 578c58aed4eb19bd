//! Clap-free settings for the migrate pipeline.

use std::num::NonZeroUsize;

/// Settings shared by every item of a batch.
#[derive(Debug, Clone)]
pub struct MigrateSettings {
    /// Upper bound on items in flight.
    pub concurrency: NonZeroUsize,

    /// Compute and report the change without backing up, checking out or writing anything.
    pub dry_run: bool,

    /// Appended to the original path to name a backup.
    pub backup_suffix: String,
}

impl Default for MigrateSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            dry_run: false,
            backup_suffix: ".bak".to_string(),
        }
    }
}

/// Available parallelism, or 4 when the platform can't tell.
pub fn default_concurrency() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN.saturating_add(3))
}
