//! Port traits abstracting the host environment away from the pipeline.
//!
//! Implementations are shared by every worker of a batch, hence `Send + Sync`.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Sink for progress and diagnostic events.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// File access used by a migration.
pub trait FileOps: Send + Sync {
    fn read_to_string(&self, path: &Utf8Path) -> anyhow::Result<String>;

    /// Copy `path` to `path + suffix`, replacing an older backup. Returns the backup path.
    fn backup(&self, path: &Utf8Path, suffix: &str) -> anyhow::Result<Utf8PathBuf>;

    fn write(&self, path: &Utf8Path, contents: &str) -> anyhow::Result<()>;
}

/// The project system that owns the build file.
pub trait ProjectLifecycle: Send + Sync {
    /// Make `path` writable (source-control checkout, read-only flag).
    fn check_out(&self, path: &Utf8Path) -> anyhow::Result<()>;

    /// Drop `item` from the project whose build file is `project`.
    fn remove_from_project(&self, project: &Utf8Path, item: &Utf8Path) -> anyhow::Result<()>;

    fn unload(&self, project: &Utf8Path) -> anyhow::Result<()>;

    fn reload(&self, project: &Utf8Path) -> anyhow::Result<()>;
}

/// The three ports a migration runs against.
#[derive(Clone, Copy)]
pub struct Ports<'a> {
    pub files: &'a dyn FileOps,
    pub project: &'a dyn ProjectLifecycle,
    pub logger: &'a dyn Logger,
}
