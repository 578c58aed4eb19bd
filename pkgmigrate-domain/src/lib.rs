//! Domain logic: turn a manifest's declarations + a build file into a migration plan.
//!
//! This crate owns *what* is removed and inserted. It does not own *how* the edits are written
//! back; that's the `pkgmigrate-edit` crate.

mod document;
mod error;
mod index;
mod planner;
mod rules;

pub use document::{BuildDocument, Element, NodeId};
pub use error::BuildFileError;
pub use index::{BuildFileIndex, NodeClass};
pub use planner::{Anchor, DeclarationBlock, MigrationPlan, MigrationPlanner, PlanWarning};
pub use rules::{RemovalRule, builtin_rules};
