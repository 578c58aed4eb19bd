//! Edit engine for pkgmigrate plans.
//!
//! Responsibilities:
//! - Apply a [`MigrationPlan`](pkgmigrate_domain::MigrationPlan) to its document in memory.
//! - Write the result back by splicing the original text, so untouched bytes stay untouched.
//! - Produce a unified diff preview and file-change hashes.
//!
//! Nothing here touches the filesystem; persistence belongs to the caller.

mod apply;
mod error;
mod patch;

pub use apply::{AppliedMigration, apply_plan};
pub use error::ApplyError;
pub use patch::{file_change, render_patch, sha256_hex};
