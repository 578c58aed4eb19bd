//! Embeddable core library for pkgmigrate.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking into an IDE extension or
//! other host process.
//!
//! # Port traits
//!
//! All host interaction is abstracted behind port traits in [`ports`]:
//! - [`Logger`](ports::Logger) : progress and diagnostic events
//! - [`FileOps`](ports::FileOps) : read, back up and write files
//! - [`ProjectLifecycle`](ports::ProjectLifecycle) : check out, detach the manifest, reload
//!
//! The [`adapters`] module provides default filesystem-backed implementations.
//!
//! # Entry points
//!
//! - [`migrate_documents`](pipeline::migrate_documents) : pure text-to-text migration
//! - [`migrate_item`](pipeline::migrate_item) : one manifest, end to end
//! - [`run_batch`](batch::run_batch) : many manifests with a concurrency cap

pub mod adapters;
pub mod batch;
pub mod pipeline;
pub mod ports;
pub mod selection;
pub mod settings;

pub use pkgmigrate_types::outcome::{ItemOutcome, ItemStatus};
pub use pkgmigrate_types::report::BatchReport;
