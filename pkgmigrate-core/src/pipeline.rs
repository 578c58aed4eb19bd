//! Single-item migration, from manifest pair to written build file.
//!
//! [`migrate_documents`] is the pure text-to-text core. [`migrate_item`] wraps it with backups,
//! checkout, the stale-file precondition, the single write and the project lifecycle calls, all
//! through the port traits.

use crate::ports::{Level, Ports};
use crate::selection::ManifestPair;
use crate::settings::MigrateSettings;
use camino::Utf8PathBuf;
use pkgmigrate_domain::{BuildFileError, BuildFileIndex, MigrationPlanner, NodeClass};
use pkgmigrate_edit::{ApplyError, apply_plan, file_change, render_patch, sha256_hex};
use pkgmigrate_manifest::{ManifestError, parse_manifest};
use pkgmigrate_types::outcome::{ItemOutcome, ItemStatus, RemovalCounts};

/// Why a single item could not be migrated. Never escapes a batch.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("malformed manifest: {0}")]
    MalformedManifest(#[from] ManifestError),

    #[error("malformed build file: {0}")]
    MalformedBuildFile(#[from] BuildFileError),

    #[error("read failure: {0:#}")]
    ReadFailure(anyhow::Error),

    #[error("write failure: {0:#}")]
    WriteFailure(anyhow::Error),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error("selection: {0}")]
    Selection(String),
}

/// Result of migrating one build file in memory.
#[derive(Debug, Clone)]
pub struct DocumentMigration {
    pub text: String,
    pub dependencies: usize,
    pub removed: RemovalCounts,
    pub warnings: Vec<String>,
    /// Planned removals per class, in declaration order of [`NodeClass`].
    pub planned: Vec<(NodeClass, usize)>,
}

/// Migrate `build_text` using the dependencies declared in `manifest_text`.
pub fn migrate_documents(
    manifest_text: &str,
    build_text: &str,
) -> Result<DocumentMigration, MigrateError> {
    let declarations = parse_manifest(manifest_text)?;
    let mut index = BuildFileIndex::parse(build_text)?;

    let plan = MigrationPlanner::new().plan(&declarations, &index);
    let planned = [
        NodeClass::LegacyReference,
        NodeClass::ConditionalError,
        NodeClass::Import,
    ]
    .into_iter()
    .map(|class| (class, plan.removal_count(class)))
    .collect();
    let warnings = plan.warnings.iter().map(ToString::to_string).collect();

    let applied = apply_plan(&mut index, &plan)?;
    Ok(DocumentMigration {
        text: applied.text,
        dependencies: applied.inserted,
        removed: applied.removed,
        warnings,
        planned,
    })
}

/// Migrate one pair. Failures come back as a `Failed` outcome and are logged.
pub fn migrate_item(
    pair: &ManifestPair,
    settings: &MigrateSettings,
    ports: Ports<'_>,
) -> ItemOutcome {
    match try_migrate_item(pair, settings, ports) {
        Ok(outcome) => outcome,
        Err(err) => {
            ports.logger.log(
                Level::Error,
                &format!("Failed to migrate \"{}\": {err}", pair.manifest),
            );
            ItemOutcome::failed(
                pair.manifest.as_str(),
                Some(pair.build_file.to_string()),
                err.to_string(),
            )
        }
    }
}

/// Like [`migrate_item`], but surfaces the error.
pub fn try_migrate_item(
    pair: &ManifestPair,
    settings: &MigrateSettings,
    ports: Ports<'_>,
) -> Result<ItemOutcome, MigrateError> {
    let log = ports.logger;
    log.log(Level::Info, &format!("Migrating \"{}\"...", pair.manifest));

    let mut build_backup: Option<Utf8PathBuf> = None;
    if !settings.dry_run {
        for path in [&pair.manifest, &pair.build_file] {
            let dest = ports
                .files
                .backup(path, &settings.backup_suffix)
                .map_err(MigrateError::WriteFailure)?;
            log.log(Level::Debug, &format!("Backed up \"{path}\" to \"{dest}\""));
            if path == &pair.build_file {
                build_backup = Some(dest);
            }
        }
        ports
            .project
            .check_out(&pair.build_file)
            .map_err(MigrateError::WriteFailure)?;
        ports
            .project
            .check_out(&pair.manifest)
            .map_err(MigrateError::WriteFailure)?;
    }

    log.log(Level::Debug, &format!("Loading \"{}\"", pair.build_file));
    let build_text = ports
        .files
        .read_to_string(&pair.build_file)
        .map_err(MigrateError::ReadFailure)?;
    let manifest_text = ports
        .files
        .read_to_string(&pair.manifest)
        .map_err(MigrateError::ReadFailure)?;
    let sha_before = sha256_hex(build_text.as_bytes());

    let migration = migrate_documents(&manifest_text, &build_text)?;
    for (class, count) in &migration.planned {
        log.log(
            Level::Debug,
            &format!("Removing <{}> elements: {count}", class.local_name()),
        );
    }
    for warning in &migration.warnings {
        log.log(Level::Warn, warning);
    }

    let mut outcome = ItemOutcome {
        manifest: pair.manifest.to_string(),
        build_file: Some(pair.build_file.to_string()),
        status: ItemStatus::Migrated,
        message: None,
        dependencies: migration.dependencies as u64,
        removed: migration.removed.clone(),
        warnings: migration.warnings.clone(),
        files: vec![],
        patch: None,
    };

    if settings.dry_run {
        outcome.status = ItemStatus::DryRun;
        outcome.patch = Some(render_patch(
            pair.build_file.as_str(),
            &build_text,
            &migration.text,
        ));
        log.log(
            Level::Info,
            &format!(
                "Dry run for \"{}\": {} dependencies, {} removals",
                pair.manifest,
                outcome.dependencies,
                outcome.removed.total()
            ),
        );
        return Ok(outcome);
    }

    let current = ports
        .files
        .read_to_string(&pair.build_file)
        .map_err(MigrateError::ReadFailure)?;
    if sha256_hex(current.as_bytes()) != sha_before {
        return Err(MigrateError::WriteFailure(anyhow::anyhow!(
            "{} changed on disk after it was read",
            pair.build_file
        )));
    }
    ports
        .files
        .write(&pair.build_file, &migration.text)
        .map_err(MigrateError::WriteFailure)?;

    let mut change = file_change(pair.build_file.as_str(), &build_text, &migration.text);
    change.backup_path = build_backup.map(|p| p.to_string());
    outcome.files.push(change);

    let project = ports.project;
    if let Err(err) = project.remove_from_project(&pair.build_file, &pair.manifest) {
        outcome
            .warnings
            .push(lifecycle_warning("remove manifest from project", &err));
    }
    match project.unload(&pair.build_file) {
        Ok(()) => {
            if let Err(err) = project.reload(&pair.build_file) {
                outcome.warnings.push(lifecycle_warning("reload project", &err));
            }
        }
        Err(err) => outcome.warnings.push(lifecycle_warning("unload project", &err)),
    }
    for warning in outcome.warnings.iter().skip(migration.warnings.len()) {
        log.log(Level::Warn, warning);
    }

    log.log(
        Level::Info,
        &format!(
            "Migrated \"{}\": {} dependencies, {} removals",
            pair.manifest,
            outcome.dependencies,
            outcome.removed.total()
        ),
    );
    Ok(outcome)
}

fn lifecycle_warning(step: &str, err: &anyhow::Error) -> String {
    format!("project lifecycle: failed to {step}: {err:#}")
}
