//! Read-only view of a `package.json` manifest.
//!
//! Only the fields needed to check workspace dependencies are deserialized:
//! identity (`name`, `version`), `scripts`, `workspaces` and the four
//! dependency sections. Every other field is ignored.

use crate::descriptor::{self, DependencyCategory, DependencyDescriptor};
use crate::satisfy::CandidatePackage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Conventional manifest file name.
pub const MANIFEST_FILE: &str = "package.json";

/// Errors that can occur when working with manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The `workspaces` field, in either of its accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkspacesField {
    /// `"workspaces": ["packages/*"]`
    Patterns(Vec<String>),
    /// `"workspaces": { "packages": ["packages/*"], "nohoist": [...] }`
    Detailed {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl Default for WorkspacesField {
    fn default() -> Self {
        Self::Patterns(Vec::new())
    }
}

/// A parsed `package.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Package name. Empty for unnamed packages such as private workspace
    /// roots.
    #[serde(default)]
    pub name: String,

    /// Package version, usually semver but never validated here.
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Named scripts (`npm run <name>`).
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,

    /// Workspace member patterns, only meaningful on a workspace root.
    #[serde(default)]
    pub workspaces: WorkspacesField,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,

    /// Path of the file this manifest was read from.
    #[serde(skip)]
    pub file: PathBuf,

    /// Directory containing `file`.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl Manifest {
    /// Load a manifest from a file path.
    ///
    /// The recorded `file` and `dir` are absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let file = std::path::absolute(path.as_ref())?;
        let content = std::fs::read_to_string(&file)?;
        Self::parse(&content, file)
    }

    /// Parse a manifest from a JSON string, recording `file` as its origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn parse(content: &str, file: impl Into<PathBuf>) -> Result<Self, ManifestError> {
        let mut manifest: Self = serde_json::from_str(content)?;
        manifest.set_file(file.into());
        Ok(manifest)
    }

    /// Point the manifest at a new file, updating `dir` accordingly.
    pub fn set_file(&mut self, file: PathBuf) {
        self.dir = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.file = file;
    }

    /// The dependency map for one category.
    #[must_use]
    pub fn section(&self, category: DependencyCategory) -> &BTreeMap<String, String> {
        match category {
            DependencyCategory::Dependencies => &self.dependencies,
            DependencyCategory::DevDependencies => &self.dev_dependencies,
            DependencyCategory::OptionalDependencies => &self.optional_dependencies,
            DependencyCategory::PeerDependencies => &self.peer_dependencies,
        }
    }

    /// Describe how this manifest depends on `module_name`, if it does.
    #[must_use]
    pub fn dependency_info(&self, module_name: &str) -> Option<DependencyDescriptor> {
        descriptor::extract(self, module_name)
    }

    /// All dependency sections merged into one map.
    ///
    /// When a name appears in several sections the higher-priority one wins
    /// (`dependencies` first, `peerDependencies` last).
    #[must_use]
    pub fn merged_dependencies(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for category in DependencyCategory::ALL {
            for (name, spec) in self.section(category) {
                merged.entry(name.clone()).or_insert_with(|| spec.clone());
            }
        }
        merged
    }

    /// Names of the scripts this package defines.
    #[must_use]
    pub fn available_scripts(&self) -> Vec<&str> {
        self.scripts.keys().map(String::as_str).collect()
    }

    /// Check whether a script is defined.
    #[must_use]
    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// Workspace member patterns declared by this manifest.
    #[must_use]
    pub fn workspace_patterns(&self) -> &[String] {
        match &self.workspaces {
            WorkspacesField::Patterns(patterns) => patterns,
            WorkspacesField::Detailed { packages } => packages,
        }
    }

    /// Check if this manifest declares workspaces.
    #[must_use]
    pub fn is_workspace_root(&self) -> bool {
        !self.workspace_patterns().is_empty()
    }

    /// The view of this package used when checking it against a dependency.
    #[must_use]
    pub fn as_candidate(&self) -> CandidatePackage {
        CandidatePackage::new(&self.name, &self.version, &self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FOOER: &str = r#"{
        "name": "fooer",
        "version": "1.2.3",
        "description": "A packaged fooer for fooing foos",
        "main": "fooer.js",
        "author": { "name": "Barney Rubble", "email": "b@rubble.com" },
        "scripts": { "start": "node fooer.js", "test": "jest" },
        "dependencies": { "foo": "^1.2.3", "wsFoo": "workspace:*" },
        "devDependencies": {
            "devFoo": "<=4.5.6",
            "devBar": "npm:0.0.1",
            "devBaz": "file:../devBaz"
        },
        "optionalDependencies": { "optFoo": "~7.8.9" },
        "peerDependencies": { "peerFoo": "10.11.x", "foo": "^2.0.0" }
    }"#;

    #[test]
    fn parse_ignores_unknown_fields() {
        let manifest = Manifest::parse(FOOER, "/ws/fooer/package.json").unwrap();
        assert_eq!(manifest.name, "fooer");
        assert_eq!(manifest.version, "1.2.3");
        assert_eq!(
            manifest.description.as_deref(),
            Some("A packaged fooer for fooing foos")
        );
        assert_eq!(manifest.dir, PathBuf::from("/ws/fooer"));
        assert_eq!(manifest.dev_dependencies.len(), 3);
    }

    #[test]
    fn parse_allows_missing_name() {
        let manifest = Manifest::parse("{}", "package.json").unwrap();
        assert!(manifest.name.is_empty());
        assert!(manifest.version.is_empty());

        let root = Manifest::parse(
            r#"{ "private": true, "workspaces": ["packages/*"] }"#,
            "/ws/package.json",
        )
        .unwrap();
        assert!(root.name.is_empty());
        assert!(root.is_workspace_root());
    }

    #[test]
    fn parse_invalid_json() {
        let err = Manifest::parse("{ invalid json }", "package.json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn merged_dependencies_prefer_higher_priority() {
        let manifest = Manifest::parse(FOOER, "/ws/fooer/package.json").unwrap();
        let merged = manifest.merged_dependencies();

        assert_eq!(merged.len(), 7);
        assert_eq!(merged["foo"], "^1.2.3");
        assert_eq!(merged["devBaz"], "file:../devBaz");
        assert_eq!(merged["peerFoo"], "10.11.x");
    }

    #[test]
    fn scripts_lookup() {
        let manifest = Manifest::parse(FOOER, "/ws/fooer/package.json").unwrap();
        assert_eq!(manifest.available_scripts(), vec!["start", "test"]);
        assert!(manifest.has_script("start"));
        assert!(!manifest.has_script("build"));

        let bare = Manifest::parse(r#"{ "name": "bare" }"#, "package.json").unwrap();
        assert!(bare.available_scripts().is_empty());
        assert!(!bare.has_script("start"));
    }

    #[test]
    fn workspaces_both_shapes() {
        let list = Manifest::parse(
            r#"{ "name": "root", "workspaces": ["apps/*", "packages/**"] }"#,
            "package.json",
        )
        .unwrap();
        assert_eq!(list.workspace_patterns(), ["apps/*", "packages/**"]);
        assert!(list.is_workspace_root());

        let detailed = Manifest::parse(
            r#"{ "name": "root", "workspaces": { "packages": ["libs/*"], "nohoist": ["**/x"] } }"#,
            "package.json",
        )
        .unwrap();
        assert_eq!(detailed.workspace_patterns(), ["libs/*"]);

        let none = Manifest::parse(r#"{ "name": "leaf" }"#, "package.json").unwrap();
        assert!(!none.is_workspace_root());
    }

    #[test]
    fn from_path_records_absolute_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_FILE);
        fs::write(&path, FOOER).unwrap();

        let manifest = Manifest::from_path(&path).unwrap();
        assert!(manifest.file.is_absolute());
        assert_eq!(manifest.file, path);
        assert_eq!(manifest.dir, tmp.path());
    }

    #[test]
    fn from_path_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = Manifest::from_path(tmp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }

    #[test]
    fn candidate_view() {
        let manifest = Manifest::parse(FOOER, "/ws/fooer/package.json").unwrap();
        let candidate = manifest.as_candidate();
        assert_eq!(candidate.name, "fooer");
        assert_eq!(candidate.version, "1.2.3");
        assert_eq!(candidate.directory, PathBuf::from("/ws/fooer"));
    }
}
