//! Shared DTOs for the pkgmigrate workspace.
//!
//! # Design constraints
//! - Outcome and report types are serialized to disk (`--report`).
//! - Prefer adding optional fields over changing semantics.

pub mod declaration;
pub mod outcome;
pub mod report;

pub use declaration::DependencyDeclaration;

/// Schema identifiers.
pub mod schema {
    pub const PKGMIGRATE_REPORT_V1: &str = "pkgmigrate.report.v1";
}

/// The legacy manifest is always named exactly this.
pub const MANIFEST_FILE_NAME: &str = "packages.config";

/// Default element namespace for nodes created in legacy build files.
pub const MSBUILD_NAMESPACE: &str = "http://schemas.microsoft.com/developer/msbuild/2003";

/// Name of the target that guards against missing package build imports.
pub const ENSURE_IMPORTS_TARGET: &str = "EnsureNuGetPackageBuildImports";
