//! Default filesystem-backed port implementations.

use crate::ports::{FileOps, Level, Logger, ProjectLifecycle};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!("{message}"),
            Level::Info => tracing::info!("{message}"),
            Level::Warn => tracing::warn!("{message}"),
            Level::Error => tracing::error!("{message}"),
        }
    }
}

/// Collects events in memory, for embedding and testing.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages logged at `level` or above.
    pub fn messages_at_least(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(l, _)| *l >= level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}

/// Appends `suffix` to the full path: `packages.config` becomes `packages.config.bak`.
pub fn backup_path(path: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}{suffix}"))
}

fn clear_read_only(path: &Utf8Path) -> anyhow::Result<()> {
    let meta = fs_err::metadata(path)?;
    let mut perms = meta.permissions();
    if perms.readonly() {
        debug!(path = %path, "clearing read-only flag");
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs_err::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Plain filesystem access through `fs-err`.
#[derive(Debug, Clone, Default)]
pub struct FsFileOps;

impl FileOps for FsFileOps {
    fn read_to_string(&self, path: &Utf8Path) -> anyhow::Result<String> {
        Ok(fs_err::read_to_string(path)?)
    }

    fn backup(&self, path: &Utf8Path, suffix: &str) -> anyhow::Result<Utf8PathBuf> {
        let dest = backup_path(path, suffix);
        if dest.exists() {
            clear_read_only(&dest).with_context(|| format!("prepare backup {dest}"))?;
        }
        fs_err::copy(path, &dest)?;
        debug!(from = %path, to = %dest, "backup written");
        Ok(dest)
    }

    fn write(&self, path: &Utf8Path, contents: &str) -> anyhow::Result<()> {
        Ok(fs_err::write(path, contents)?)
    }
}

/// Lifecycle for project files that no IDE or source-control system owns.
///
/// Checking out only clears the read-only flag. Removing the manifest from the project deletes
/// it unless `delete_manifest` is off. Unload and reload have nothing to do.
#[derive(Debug, Clone)]
pub struct StandaloneProject {
    pub delete_manifest: bool,
}

impl Default for StandaloneProject {
    fn default() -> Self {
        Self {
            delete_manifest: true,
        }
    }
}

impl ProjectLifecycle for StandaloneProject {
    fn check_out(&self, path: &Utf8Path) -> anyhow::Result<()> {
        clear_read_only(path).with_context(|| format!("check out {path}"))
    }

    fn remove_from_project(&self, project: &Utf8Path, item: &Utf8Path) -> anyhow::Result<()> {
        if !self.delete_manifest {
            debug!(project = %project, item = %item, "keeping manifest on disk");
            return Ok(());
        }
        fs_err::remove_file(item).with_context(|| format!("remove {item} from {project}"))
    }

    fn unload(&self, project: &Utf8Path) -> anyhow::Result<()> {
        debug!(project = %project, "unload: not loaded");
        Ok(())
    }

    fn reload(&self, project: &Utf8Path) -> anyhow::Result<()> {
        debug!(project = %project, "reload: not loaded");
        Ok(())
    }
}
