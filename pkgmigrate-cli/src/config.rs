//! Configuration file loading for pkgmigrate.
//!
//! Discovers and loads `pkgmigrate.toml` from the selection root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pkgmigrate_core::settings::{MigrateSettings, default_concurrency};
use serde::Deserialize;
use std::num::NonZeroUsize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "pkgmigrate.toml";

/// Top-level configuration from pkgmigrate.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PkgmigrateConfig {
    pub batch: BatchConfig,
    pub backups: BackupsConfig,
    pub project: ProjectConfig,
}

/// Batch section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Maximum number of manifests migrated at once (default: available parallelism).
    pub concurrency: Option<NonZeroUsize>,
}

/// Backups section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupsConfig {
    /// Suffix appended to the original file name.
    pub suffix: String,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            suffix: ".bak".to_string(),
        }
    }
}

/// Project section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project file extensions paired with a manifest, without the dot.
    pub extensions: Vec<String>,

    /// Delete `packages.config` once the project no longer uses it.
    pub delete_manifest: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["csproj".into(), "vbproj".into(), "fsproj".into()],
            delete_manifest: true,
        }
    }
}

/// Discover `pkgmigrate.toml` in `root`.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.is_file() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a pkgmigrate.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<PkgmigrateConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<PkgmigrateConfig> {
    let config: PkgmigrateConfig = toml::from_str(contents).context("invalid TOML")?;
    if config.project.extensions.is_empty() {
        anyhow::bail!("[project] extensions must not be empty");
    }
    Ok(config)
}

/// Load the explicit config if given, else the one in `root`, else defaults.
pub fn load_or_default(
    explicit: Option<&Utf8Path>,
    root: &Utf8Path,
) -> anyhow::Result<PkgmigrateConfig> {
    match explicit.map(Utf8Path::to_path_buf).or_else(|| discover_config(root)) {
        Some(path) => load_config(&path),
        None => Ok(PkgmigrateConfig::default()),
    }
}

/// Configuration after CLI flags have been applied.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub settings: MigrateSettings,
    pub extensions: Vec<String>,
    pub delete_manifest: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: PkgmigrateConfig,
}

impl ConfigMerger {
    pub fn new(config: PkgmigrateConfig) -> Self {
        Self { config }
    }

    /// Merge with `migrate` arguments.
    ///
    /// A CLI concurrency replaces the config value; `keep_manifest` wins over
    /// `delete_manifest = true`.
    pub fn merge_migrate_args(
        self,
        cli_concurrency: Option<NonZeroUsize>,
        dry_run: bool,
        keep_manifest: bool,
    ) -> MergedConfig {
        let concurrency = cli_concurrency
            .or(self.config.batch.concurrency)
            .unwrap_or_else(default_concurrency);

        MergedConfig {
            settings: MigrateSettings {
                concurrency,
                dry_run,
                backup_suffix: self.config.backups.suffix,
            },
            extensions: self.config.project.extensions,
            delete_manifest: self.config.project.delete_manifest && !keep_manifest,
        }
    }
}
