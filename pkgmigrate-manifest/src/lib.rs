//! `packages.config` ingestion.
//!
//! The manifest is read into an ordered list of [`DependencyDeclaration`]s. Every child element of
//! the root counts as an entry, whatever its name; an entry without `id` or `version` makes the
//! whole manifest malformed.

mod parse;

pub use parse::{ManifestError, parse_manifest};
pub use pkgmigrate_types::DependencyDeclaration;
