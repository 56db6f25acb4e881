//! Checking whether a workspace package satisfies a dependency entry.
//!
//! The check depends on the protocol of the entry:
//! - `workspace:` entries are satisfied by any package inside the workspace
//! - `file:`, `link:` and `portal:` entries must point at the package directory
//! - bare and `npm:` entries are checked against the package version
//! - every other protocol names a remote source and is never satisfied locally
//!
//! Some outcomes are a "soft failure": the verdict is positive but comes with
//! an error explaining that it could not actually be verified. Callers must
//! branch on [`Satisfaction::is_satisfied`], never on the presence of an error.

use crate::descriptor::{DependencyDescriptor, Protocol};
use crate::paths;
use crate::version::{self, VersionConstraint};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Ranges that accept any version without being parsed.
const ANY_VERSION: [&str; 4] = ["", "*", "^", "~"];

/// Reasons a dependency is not, or not provably, satisfied.
#[derive(Error, Debug)]
pub enum SatisfyError {
    #[error("cannot satisfy workspace dependency: package name mismatch: {found} != {expected}")]
    NameMismatch { expected: String, found: String },

    #[error(
        "cannot satisfy workspace dependency: '{name}' uses the workspace protocol but no workspace directory was given"
    )]
    MissingWorkspaceInfo { name: String },

    #[error(
        "cannot satisfy workspace dependency: {} is outside workspace {}",
        .directory.display(),
        .root.display()
    )]
    OutsideWorkspace { directory: PathBuf, root: PathBuf },

    #[error(
        "cannot satisfy workspace dependency: '{name}' points to {} but the package lives in {}",
        .expected.display(),
        .found.display()
    )]
    PathMismatch {
        name: String,
        expected: PathBuf,
        found: PathBuf,
    },

    #[error("cannot satisfy workspace dependency: '{name}' uses remote protocol '{protocol}'")]
    RemoteProtocol { name: String, protocol: String },

    #[error("cannot satisfy workspace dependency: can't parse version '{value}': {reason}")]
    VersionRangeUnparseable { value: String, reason: String },

    #[error("cannot satisfy workspace dependency: version {version} does not match range '{range}'")]
    VersionRangeNotSatisfied { range: String, version: String },

    #[error("cannot satisfy workspace dependency: can't resolve path {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Discriminant of a [`SatisfyError`], convenient for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SatisfyErrorKind {
    NameMismatch,
    MissingWorkspaceInfo,
    OutsideWorkspace,
    PathMismatch,
    RemoteProtocol,
    VersionRangeUnparseable,
    VersionRangeNotSatisfied,
    Io,
}

impl SatisfyError {
    #[must_use]
    pub fn kind(&self) -> SatisfyErrorKind {
        match self {
            Self::NameMismatch { .. } => SatisfyErrorKind::NameMismatch,
            Self::MissingWorkspaceInfo { .. } => SatisfyErrorKind::MissingWorkspaceInfo,
            Self::OutsideWorkspace { .. } => SatisfyErrorKind::OutsideWorkspace,
            Self::PathMismatch { .. } => SatisfyErrorKind::PathMismatch,
            Self::RemoteProtocol { .. } => SatisfyErrorKind::RemoteProtocol,
            Self::VersionRangeUnparseable { .. } => SatisfyErrorKind::VersionRangeUnparseable,
            Self::VersionRangeNotSatisfied { .. } => SatisfyErrorKind::VersionRangeNotSatisfied,
            Self::Io { .. } => SatisfyErrorKind::Io,
        }
    }

    /// Whether this error rules the dependency out. Only an unparseable
    /// version range still lets the dependency through.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::VersionRangeUnparseable { .. })
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The package checked against a dependency entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePackage {
    pub name: String,
    /// Declared version, possibly not valid semver.
    pub version: String,
    /// Package root directory.
    pub directory: PathBuf,
}

impl CandidatePackage {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            directory: directory.into(),
        }
    }
}

/// Outcome of a satisfaction check.
#[derive(Debug)]
#[must_use]
pub struct Satisfaction {
    satisfied: bool,
    error: Option<SatisfyError>,
}

impl Satisfaction {
    fn satisfied() -> Self {
        Self {
            satisfied: true,
            error: None,
        }
    }

    fn rejected(error: SatisfyError) -> Self {
        Self {
            satisfied: false,
            error: Some(error),
        }
    }

    fn unverified(error: SatisfyError) -> Self {
        Self {
            satisfied: true,
            error: Some(error),
        }
    }

    /// The verdict.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Why the verdict is negative, or why a positive one is unproven.
    #[must_use]
    pub fn error(&self) -> Option<&SatisfyError> {
        self.error.as_ref()
    }

    /// A positive verdict that could not be verified.
    #[must_use]
    pub fn is_soft_failure(&self) -> bool {
        self.satisfied && self.error.is_some()
    }

    /// Split into the verdict and the optional error.
    #[must_use]
    pub fn into_parts(self) -> (bool, Option<SatisfyError>) {
        (self.satisfied, self.error)
    }

    /// The verdict as a `Result`: negative verdicts become their error,
    /// soft failures are accepted.
    ///
    /// # Errors
    ///
    /// Returns the error of a negative verdict.
    pub fn into_result(self) -> Result<bool, SatisfyError> {
        match (self.satisfied, self.error) {
            (false, Some(error)) => Err(error),
            (satisfied, _) => Ok(satisfied),
        }
    }
}

/// Evaluates dependency entries against candidate packages.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    /// Root of the workspace candidates must live in.
    workspace_root: Option<PathBuf>,
}

impl Evaluator {
    /// Create an evaluator without a workspace root.
    ///
    /// Without a root, `workspace:` entries cannot be satisfied and other
    /// entries default to the directory of the declaring manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workspace root. An empty path is the same as no root.
    #[must_use]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.workspace_root = (!root.as_os_str().is_empty()).then_some(root);
        self
    }

    /// The configured workspace root.
    #[must_use]
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    /// Check whether `candidate` satisfies `dependency`.
    pub fn evaluate(
        &self,
        candidate: &CandidatePackage,
        dependency: &DependencyDescriptor,
    ) -> Satisfaction {
        let outcome = self.check(candidate, dependency);
        debug!(
            dependency = %dependency.name,
            from = %dependency.from_name,
            specifier = %dependency.specifier(),
            candidate = %candidate.directory.display(),
            satisfied = outcome.satisfied,
            error = outcome.error.as_ref().map(tracing::field::display),
            "evaluated workspace dependency"
        );
        outcome
    }

    fn check(&self, candidate: &CandidatePackage, dependency: &DependencyDescriptor) -> Satisfaction {
        if candidate.name != dependency.name {
            return Satisfaction::rejected(SatisfyError::NameMismatch {
                expected: dependency.name.clone(),
                found: candidate.name.clone(),
            });
        }

        let root = match &self.workspace_root {
            Some(root) => root.clone(),
            None if dependency.protocol == Protocol::Workspace => {
                return Satisfaction::rejected(SatisfyError::MissingWorkspaceInfo {
                    name: dependency.name.clone(),
                });
            }
            None => paths::parent_dir(&dependency.from_file),
        };
        let root = match paths::absolutize(&root) {
            Ok(root) => root,
            Err(e) => return Satisfaction::rejected(SatisfyError::io(&root, e)),
        };
        let directory = match paths::absolutize(&candidate.directory) {
            Ok(directory) => directory,
            Err(e) => return Satisfaction::rejected(SatisfyError::io(&candidate.directory, e)),
        };
        trace!(root = %root.display(), directory = %directory.display(), "membership check");

        if !paths::is_within(&directory, &root) {
            return Satisfaction::rejected(SatisfyError::OutsideWorkspace { directory, root });
        }

        match &dependency.protocol {
            Protocol::Workspace => Satisfaction::satisfied(),
            Protocol::File | Protocol::Link | Protocol::Portal => {
                check_path(dependency, &directory)
            }
            Protocol::Remote(protocol) => Satisfaction::rejected(SatisfyError::RemoteProtocol {
                name: dependency.name.clone(),
                protocol: protocol.clone(),
            }),
            Protocol::Npm => check_version(npm_alias_range(&dependency.version_range), candidate),
            Protocol::Bare => check_version(&dependency.version_range, candidate),
        }
    }
}

/// Check whether `candidate` satisfies `dependency`.
///
/// `workspace_root` bounds the directories candidates may live in; when
/// `None` it defaults to the directory of the declaring manifest, except for
/// `workspace:` entries which are then rejected.
pub fn satisfies(
    candidate: &CandidatePackage,
    dependency: &DependencyDescriptor,
    workspace_root: Option<&Path>,
) -> Satisfaction {
    let evaluator = match workspace_root {
        Some(root) => Evaluator::new().with_workspace_root(root),
        None => Evaluator::new(),
    };
    evaluator.evaluate(candidate, dependency)
}

/// Local protocols: the range is a path relative to the declaring manifest.
fn check_path(dependency: &DependencyDescriptor, directory: &Path) -> Satisfaction {
    let target = paths::parent_dir(&dependency.from_file).join(&dependency.version_range);
    let expected = match paths::absolutize(&target) {
        Ok(expected) => expected,
        Err(e) => return Satisfaction::rejected(SatisfyError::io(&target, e)),
    };

    if expected == directory {
        Satisfaction::satisfied()
    } else {
        Satisfaction::rejected(SatisfyError::PathMismatch {
            name: dependency.name.clone(),
            expected,
            found: directory.to_path_buf(),
        })
    }
}

fn check_version(range: &str, candidate: &CandidatePackage) -> Satisfaction {
    let range = range.trim();
    if ANY_VERSION.contains(&range) {
        return Satisfaction::satisfied();
    }

    let constraint = match VersionConstraint::parse(range) {
        Ok(constraint) => constraint,
        Err(e) => {
            return Satisfaction::unverified(SatisfyError::VersionRangeUnparseable {
                value: range.to_string(),
                reason: e.to_string(),
            });
        }
    };
    let version = match version::parse_version(&candidate.version) {
        Ok(version) => version,
        Err(e) => {
            return Satisfaction::unverified(SatisfyError::VersionRangeUnparseable {
                value: candidate.version.clone(),
                reason: e.to_string(),
            });
        }
    };

    if constraint.matches(&version) {
        Satisfaction::satisfied()
    } else {
        Satisfaction::rejected(SatisfyError::VersionRangeNotSatisfied {
            range: range.to_string(),
            version: candidate.version.clone(),
        })
    }
}

/// `npm:real-name@^1.0.0` aliases carry the range after the last `@`.
/// A leading `@` belongs to a scope, not to the range.
fn npm_alias_range(range: &str) -> &str {
    match range.rfind('@') {
        Some(at) if at > 0 => &range[at + 1..],
        _ => range,
    }
}
