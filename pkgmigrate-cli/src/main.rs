mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use config::ConfigMerger;
use fs_err as fs;
use pkgmigrate_core::adapters::{FsFileOps, StandaloneProject, TracingLogger};
use pkgmigrate_core::batch::run_batch;
use pkgmigrate_core::ports::Ports;
use pkgmigrate_core::selection::{
    ManifestPair, Selection, SelectionError, discover_pairs, select_manifests,
};
use pkgmigrate_types::outcome::{ItemOutcome, ItemStatus};
use pkgmigrate_types::report::BatchReport;
use std::num::NonZeroUsize;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pkgmigrate",
    version,
    about = "Migrate packages.config projects to PackageReference."
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate every selected manifest into its project file.
    Migrate(MigrateArgs),
    /// Show which manifest pairs with which project file, without migrating.
    List(SelectArgs),
}

#[derive(Debug, Parser)]
struct SelectArgs {
    /// Directories to search recursively, or packages.config files (default: current directory).
    #[arg(default_value = ".")]
    paths: Vec<Utf8PathBuf>,

    /// Config file (default: <first path>/pkgmigrate.toml when present).
    #[arg(long, env = "PKGMIGRATE_CONFIG")]
    config: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct MigrateArgs {
    #[command(flatten)]
    select: SelectArgs,

    /// Maximum number of manifests migrated at once.
    #[arg(short = 'j', long)]
    concurrency: Option<NonZeroUsize>,

    /// Print the diff of each project file instead of writing anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Leave packages.config on disk after migrating.
    #[arg(long, default_value_t = false)]
    keep_manifest: bool,

    /// Write the batch report as JSON to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Migrate(args) => cmd_migrate(args),
        Command::List(args) => cmd_list(args),
    }
}

fn cmd_migrate(args: MigrateArgs) -> anyhow::Result<ExitCode> {
    let root = config_root(&args.select.paths);
    let file_config = config::load_or_default(args.select.config.as_deref(), &root)
        .context("load pkgmigrate.toml config")?;
    let merged = ConfigMerger::new(file_config).merge_migrate_args(
        args.concurrency,
        args.dry_run,
        args.keep_manifest,
    );
    debug!(
        "merged config: concurrency={}, dry_run={}, suffix={:?}, extensions={:?}, delete_manifest={}",
        merged.settings.concurrency,
        merged.settings.dry_run,
        merged.settings.backup_suffix,
        merged.extensions,
        merged.delete_manifest
    );

    let selection = select(&args.select.paths, &merged.extensions)?;
    if selection.is_empty() {
        info!("no packages.config found");
    }

    let project = StandaloneProject {
        delete_manifest: merged.delete_manifest,
    };
    let ports = Ports {
        files: &FsFileOps,
        project: &project,
        logger: &TracingLogger,
    };
    let report = run_batch(selection, &merged.settings, ports);

    print_report(&report);
    if let Some(path) = &args.report {
        write_json(path, &report)?;
        info!("wrote report to {}", path);
    }

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn cmd_list(args: SelectArgs) -> anyhow::Result<ExitCode> {
    let root = config_root(&args.paths);
    let file_config = config::load_or_default(args.config.as_deref(), &root)
        .context("load pkgmigrate.toml config")?;

    for entry in select(&args.paths, &file_config.project.extensions)? {
        match entry {
            Ok(pair) => println!("{} -> {}", pair.manifest, pair.build_file),
            Err(err) => println!("{} -> (skipped: {})", err.manifest, err.reason),
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Directory the config file is looked up in.
fn config_root(paths: &[Utf8PathBuf]) -> Utf8PathBuf {
    let Some(first) = paths.first() else {
        return Utf8PathBuf::from(".");
    };
    if first.is_dir() {
        return first.clone();
    }
    match first.parent() {
        Some(p) if !p.as_str().is_empty() => p.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    }
}

fn select(paths: &[Utf8PathBuf], extensions: &[String]) -> anyhow::Result<Selection> {
    let mut selection = Selection::new();
    for path in paths {
        if path.is_dir() {
            selection.extend(discover_pairs(path, extensions)?);
        } else {
            selection.extend(select_manifests(std::slice::from_ref(path), extensions));
        }
    }
    selection.sort_by(|a, b| manifest_of(a).cmp(manifest_of(b)));
    selection.dedup_by(|a, b| manifest_of(a) == manifest_of(b));
    Ok(selection)
}

fn manifest_of(entry: &Result<ManifestPair, SelectionError>) -> &Utf8Path {
    match entry {
        Ok(pair) => &pair.manifest,
        Err(err) => &err.manifest,
    }
}

fn print_report(report: &BatchReport) {
    for item in &report.items {
        println!("{}", item_line(item));
        if let Some(patch) = &item.patch {
            print!("{patch}");
        }
    }
    println!(
        "{} manifests: {} succeeded, {} failed",
        report.summary.total, report.summary.succeeded, report.summary.failed
    );
}

fn item_line(item: &ItemOutcome) -> String {
    match item.status {
        ItemStatus::Migrated | ItemStatus::DryRun => {
            let verb = if item.status == ItemStatus::DryRun {
                "would migrate"
            } else {
                "migrated"
            };
            let mut line = format!(
                "{verb} {} ({} dependencies, {} nodes removed)",
                item.manifest,
                item.dependencies,
                item.removed.total()
            );
            for w in &item.warnings {
                line.push_str(&format!("\n  warning: {w}"));
            }
            line
        }
        ItemStatus::Failed => format!(
            "failed {}: {}",
            item.manifest,
            item.message.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}
