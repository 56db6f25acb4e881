//! Workspace dependency checks for npm-style monorepos.
//!
//! This crate provides:
//! - Extraction of dependency entries from a `package.json`
//! - Protocol-aware satisfaction checks (`workspace:`, `file:`, `link:`,
//!   `portal:`, `npm:` and plain version ranges)
//! - npm version ranges on top of `semver`
//! - Workspace member discovery from `workspaces` glob patterns

mod descriptor;
mod manifest;
mod paths;
mod satisfy;
mod version;
mod workspace;

pub use descriptor::{extract, DependencyCategory, DependencyDescriptor, Protocol};
pub use manifest::{Manifest, ManifestError, WorkspacesField, MANIFEST_FILE};
pub use paths::{absolutize, is_within, normalize};
pub use satisfy::{
    satisfies, CandidatePackage, Evaluator, Satisfaction, SatisfyError, SatisfyErrorKind,
};
pub use version::{parse_version, VersionConstraint};
pub use workspace::{filter_workspace_dirs, DependencyCheck, Workspace, WorkspaceError};
