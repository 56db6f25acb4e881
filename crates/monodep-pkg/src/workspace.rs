//! Workspace support for multi-package repositories.
//!
//! A workspace root is a `package.json` listing its members as glob
//! patterns, where a leading `!` excludes matching directories:
//!
//! ```json
//! {
//!   "name": "monorepo",
//!   "private": true,
//!   "workspaces": ["apps/*", "packages/**", "!**/tests/**"]
//! }
//! ```

use crate::descriptor::DependencyDescriptor;
use crate::manifest::{Manifest, ManifestError, MANIFEST_FILE};
use crate::paths;
use crate::satisfy::{CandidatePackage, Evaluator, Satisfaction};
use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when working with workspaces.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("not a workspace: {} declares no workspaces", .0.display())]
    NotAWorkspace(PathBuf),
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One `workspaces` entry, compiled.
struct MemberPattern {
    pattern: Pattern,
    /// For `dir/**`, the pattern for `dir` itself.
    base: Option<Pattern>,
    negated: bool,
}

impl MemberPattern {
    fn new(raw: &str) -> Result<Self, glob::PatternError> {
        let (negated, raw) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let raw = raw.strip_prefix("./").unwrap_or(raw);
        let base = match raw.strip_suffix("/**") {
            Some(base) if !base.is_empty() => Some(Pattern::new(base)?),
            _ => None,
        };
        Ok(Self {
            pattern: Pattern::new(raw)?,
            base,
            negated,
        })
    }

    fn matches(&self, dir: &str) -> bool {
        self.pattern.matches_with(dir, MATCH_OPTIONS)
            || self
                .base
                .as_ref()
                .is_some_and(|base| base.matches_with(dir, MATCH_OPTIONS))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<MemberPattern>, glob::PatternError> {
    patterns.iter().map(|p| MemberPattern::new(p)).collect()
}

fn is_member(patterns: &[MemberPattern], dir: &str) -> bool {
    let (excludes, includes): (Vec<_>, Vec<_>) = patterns.iter().partition(|p| p.negated);
    includes.iter().any(|p| p.matches(dir)) && !excludes.iter().any(|p| p.matches(dir))
}

/// Keep the directories (relative to the manifest directory) that the
/// manifest's `workspaces` patterns select.
///
/// A directory is kept when a plain pattern matches it and no `!` pattern
/// does. `*` never crosses a `/`, and a trailing `/**` also matches the
/// directory itself. With `absolute`, kept directories are joined onto the
/// manifest directory.
///
/// # Errors
///
/// Returns an error if a pattern is not a valid glob.
pub fn filter_workspace_dirs<P: AsRef<Path>>(
    manifest: &Manifest,
    dirs: &[P],
    absolute: bool,
) -> Result<Vec<PathBuf>, WorkspaceError> {
    let patterns = compile(manifest.workspace_patterns())?;

    Ok(dirs
        .iter()
        .map(AsRef::as_ref)
        .filter(|dir| is_member(&patterns, &to_slash(dir)))
        .map(|dir| {
            if absolute {
                manifest.dir.join(dir)
            } else {
                dir.to_path_buf()
            }
        })
        .collect())
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The result of checking one dependency entry against a workspace member.
#[derive(Debug)]
pub struct DependencyCheck {
    /// The dependency entry, as declared by the depending package.
    pub dependency: DependencyDescriptor,
    /// The member that was checked.
    pub member: CandidatePackage,
    /// Verdict of the check.
    pub satisfaction: Satisfaction,
}

/// A workspace with all discovered members.
#[derive(Debug)]
pub struct Workspace {
    /// Root directory of the workspace.
    pub root: PathBuf,

    /// The root manifest.
    pub manifest: Manifest,

    /// Member packages, ordered by directory.
    pub members: Vec<Manifest>,
}

impl Workspace {
    /// Build a workspace from already loaded manifests.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, manifest: Manifest, members: Vec<Manifest>) -> Self {
        Self {
            root: root.into(),
            manifest,
            members,
        }
    }

    /// Load a workspace from a directory containing a root `package.json`.
    ///
    /// Members are the directories selected by the `workspaces` patterns that
    /// contain a manifest. Anything below `node_modules` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the root manifest is not a workspace, or a
    /// pattern or member manifest is invalid.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let root = paths::absolutize(root.as_ref())?;
        let manifest = Manifest::from_path(root.join(MANIFEST_FILE))?;
        if !manifest.is_workspace_root() {
            return Err(WorkspaceError::NotAWorkspace(manifest.file));
        }

        let candidates = Self::candidate_dirs(&root, manifest.workspace_patterns())?;
        let member_dirs = filter_workspace_dirs(&manifest, &candidates, true)?;

        let members = member_dirs
            .iter()
            .map(|dir| Manifest::from_path(dir.join(MANIFEST_FILE)))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(root = %root.display(), members = members.len(), "loaded workspace");

        Ok(Self {
            root,
            manifest,
            members,
        })
    }

    /// Relative directories matched by the non-negated patterns that hold a
    /// manifest.
    fn candidate_dirs(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, WorkspaceError> {
        let escaped_root = PathBuf::from(Pattern::escape(&root.to_string_lossy()));
        let mut dirs = BTreeSet::new();

        for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
            let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
            let full_pattern = escaped_root.join(pattern);

            for entry in glob::glob(&full_pattern.to_string_lossy())? {
                let path = entry.map_err(|e| WorkspaceError::Io(e.into()))?;
                if !path.join(MANIFEST_FILE).is_file() {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                if relative.as_os_str().is_empty()
                    || relative
                        .components()
                        .any(|c| c.as_os_str() == "node_modules")
                {
                    continue;
                }
                dirs.insert(relative.to_path_buf());
            }
        }

        Ok(dirs.into_iter().collect())
    }

    /// Get a member by package name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Manifest> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Get the names of all members.
    #[must_use]
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    /// Check if a path is within this workspace.
    ///
    /// Relative paths are resolved against the working directory, as the
    /// evaluator does. A path that cannot be resolved is not contained.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        match (paths::absolutize(path), paths::absolutize(&self.root)) {
            (Ok(path), Ok(root)) => paths::is_within(&path, &root),
            _ => false,
        }
    }

    /// An evaluator bounded by this workspace.
    #[must_use]
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new().with_workspace_root(&self.root)
    }

    /// Check every dependency of `parent` that names a workspace member.
    ///
    /// Results are sorted by dependency name.
    #[must_use]
    pub fn check(&self, parent: &Manifest) -> Vec<DependencyCheck> {
        let evaluator = self.evaluator();
        let mut checks: Vec<DependencyCheck> = self
            .members
            .par_iter()
            .filter_map(|member| {
                let dependency = parent.dependency_info(&member.name)?;
                let member = member.as_candidate();
                let satisfaction = evaluator.evaluate(&member, &dependency);
                Some(DependencyCheck {
                    dependency,
                    member,
                    satisfaction,
                })
            })
            .collect();
        checks.sort_by(|a, b| a.dependency.name.cmp(&b.dependency.name));
        checks
    }

    /// Check the dependencies of every member against the other members.
    ///
    /// Results are grouped by depending package, in member order.
    #[must_use]
    pub fn check_all(&self) -> Vec<DependencyCheck> {
        self.members
            .par_iter()
            .flat_map_iter(|parent| self.check(parent))
            .collect()
    }
}
