//! Dependency descriptors extracted from a manifest.
//!
//! A descriptor captures one dependency entry (`"foo": "workspace:^1.0.0"`)
//! together with the manifest that declared it, so that it can be checked
//! against a candidate package later on.

use crate::manifest::Manifest;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Which section of the manifest a dependency came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyCategory {
    /// Runtime dependencies.
    Dependencies,
    /// Development-only dependencies.
    DevDependencies,
    /// Optional dependencies.
    OptionalDependencies,
    /// Peer dependencies.
    PeerDependencies,
}

impl DependencyCategory {
    /// All categories in lookup priority order.
    pub const ALL: [Self; 4] = [
        Self::Dependencies,
        Self::DevDependencies,
        Self::OptionalDependencies,
        Self::PeerDependencies,
    ];

    /// The manifest key for this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::OptionalDependencies => "optionalDependencies",
            Self::PeerDependencies => "peerDependencies",
        }
    }
}

impl fmt::Display for DependencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The protocol prefix of a dependency specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// No prefix: a plain version or range.
    Bare,
    /// `workspace:`
    Workspace,
    /// `file:`
    File,
    /// `link:`
    Link,
    /// `portal:`
    Portal,
    /// `npm:`
    Npm,
    /// Anything else (`git`, `https`, `github`, ...), kept verbatim.
    Remote(String),
}

impl Protocol {
    /// Classify a protocol prefix. The empty prefix is [`Protocol::Bare`].
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "" => Self::Bare,
            "workspace" => Self::Workspace,
            "file" => Self::File,
            "link" => Self::Link,
            "portal" => Self::Portal,
            "npm" => Self::Npm,
            other => Self::Remote(other.to_string()),
        }
    }

    /// The prefix as written in the manifest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bare => "",
            Self::Workspace => "workspace",
            Self::File => "file",
            Self::Link => "link",
            Self::Portal => "portal",
            Self::Npm => "npm",
            Self::Remote(other) => other,
        }
    }

    /// Whether the range of this protocol is a path relative to the
    /// declaring manifest.
    #[must_use]
    pub fn is_local_path(&self) -> bool {
        matches!(self, Self::File | Self::Link | Self::Portal)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dependency entry and the manifest that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    /// Name of the dependency.
    pub name: String,
    /// Specifier without its protocol prefix. A path for local protocols,
    /// a version range otherwise.
    pub version_range: String,
    /// Section the entry was found in.
    pub category: DependencyCategory,
    /// Protocol prefix of the specifier, [`Protocol::Bare`] when absent.
    pub protocol: Protocol,
    /// Name of the declaring package.
    pub from_name: String,
    /// Version of the declaring package.
    pub from_version: String,
    /// Manifest file of the declaring package.
    pub from_file: PathBuf,
}

impl DependencyDescriptor {
    /// Build a descriptor from a raw specifier such as `"file:../foo"`.
    ///
    /// Only the first `:` separates the protocol, so `"file:C:/x"` keeps
    /// `C:/x` as its range.
    #[must_use]
    pub fn from_specifier(
        name: impl Into<String>,
        specifier: &str,
        category: DependencyCategory,
        from: &Manifest,
    ) -> Self {
        let (protocol, version_range) = match specifier.split_once(':') {
            Some((prefix, rest)) => (Protocol::from_prefix(prefix), rest),
            None => (Protocol::Bare, specifier),
        };

        Self {
            name: name.into(),
            version_range: version_range.to_string(),
            category,
            protocol,
            from_name: from.name.clone(),
            from_version: from.version.clone(),
            from_file: from.file.clone(),
        }
    }

    /// The specifier as written in the manifest.
    #[must_use]
    pub fn specifier(&self) -> String {
        match self.protocol {
            Protocol::Bare => self.version_range.clone(),
            ref protocol => format!("{protocol}:{}", self.version_range),
        }
    }
}

/// Look up `module_name` in the dependency sections of `manifest`.
///
/// Sections are probed in [`DependencyCategory::ALL`] order and the first
/// hit wins. Returns `None` when the manifest does not depend on the module.
#[must_use]
pub fn extract(manifest: &Manifest, module_name: &str) -> Option<DependencyDescriptor> {
    DependencyCategory::ALL.into_iter().find_map(|category| {
        let specifier = manifest.section(category).get(module_name)?;
        debug!(
            from = %manifest.name,
            dependency = module_name,
            %category,
            specifier = specifier.as_str(),
            "found dependency entry"
        );
        Some(DependencyDescriptor::from_specifier(
            module_name,
            specifier,
            category,
            manifest,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fooer() -> Manifest {
        let json = r#"{
            "name": "fooer",
            "version": "1.2.3",
            "dependencies": { "foo": "^1.2.3", "wsFoo": "workspace:*" },
            "devDependencies": {
                "devFoo": "<=4.5.6",
                "devBar": "npm:0.0.1",
                "devBaz": "file:../devBaz",
                "shared": "^2.0.0"
            },
            "optionalDependencies": { "optFoo": "~7.8.9", "shared": "^3.0.0" },
            "peerDependencies": { "peerFoo": "10.11.x", "shared": "^4.0.0" }
        }"#;
        Manifest::parse(json, "/ws/fooer/package.json").unwrap()
    }

    fn check(name: &str, category: DependencyCategory, range: &str, protocol: Protocol) {
        let manifest = fooer();
        let info = extract(&manifest, name).unwrap();
        assert_eq!(info.name, name);
        assert_eq!(info.category, category);
        assert_eq!(info.version_range, range);
        assert_eq!(info.protocol, protocol);
        assert_eq!(info.from_name, "fooer");
        assert_eq!(info.from_version, "1.2.3");
        assert_eq!(info.from_file, PathBuf::from("/ws/fooer/package.json"));
    }

    #[test]
    fn extract_from_each_section() {
        check("foo", DependencyCategory::Dependencies, "^1.2.3", Protocol::Bare);
        check("devFoo", DependencyCategory::DevDependencies, "<=4.5.6", Protocol::Bare);
        check("devBar", DependencyCategory::DevDependencies, "0.0.1", Protocol::Npm);
        check("devBaz", DependencyCategory::DevDependencies, "../devBaz", Protocol::File);
        check("optFoo", DependencyCategory::OptionalDependencies, "~7.8.9", Protocol::Bare);
        check("peerFoo", DependencyCategory::PeerDependencies, "10.11.x", Protocol::Bare);
        check("wsFoo", DependencyCategory::Dependencies, "*", Protocol::Workspace);
    }

    #[test]
    fn first_section_wins() {
        let info = extract(&fooer(), "shared").unwrap();
        assert_eq!(info.category, DependencyCategory::DevDependencies);
        assert_eq!(info.version_range, "^2.0.0");
    }

    #[test]
    fn unknown_dependency_is_none() {
        assert!(extract(&fooer(), "Unknown").is_none());
        assert!(fooer().dependency_info("").is_none());
    }

    #[test]
    fn split_on_first_colon_only() {
        let manifest = fooer();
        let info = DependencyDescriptor::from_specifier(
            "win",
            "file:C:/pkgs/win",
            DependencyCategory::Dependencies,
            &manifest,
        );
        assert_eq!(info.protocol, Protocol::File);
        assert_eq!(info.version_range, "C:/pkgs/win");
        assert_eq!(info.specifier(), "file:C:/pkgs/win");

        let info = DependencyDescriptor::from_specifier(
            "remote",
            "git+https://example.com/repo.git#main",
            DependencyCategory::Dependencies,
            &manifest,
        );
        assert_eq!(info.protocol, Protocol::Remote("git+https".to_string()));
        assert_eq!(info.version_range, "//example.com/repo.git#main");
        assert_eq!(info.specifier(), "git+https://example.com/repo.git#main");
    }

    #[test]
    fn bare_specifier_round_trips() {
        let info = DependencyDescriptor::from_specifier(
            "foo",
            ">=1.0.0 <2.0.0",
            DependencyCategory::PeerDependencies,
            &fooer(),
        );
        assert_eq!(info.protocol, Protocol::Bare);
        assert_eq!(info.protocol.as_str(), "");
        assert_eq!(info.specifier(), ">=1.0.0 <2.0.0");
    }

    #[test]
    fn protocol_classification() {
        assert_eq!(Protocol::from_prefix("portal"), Protocol::Portal);
        assert_eq!(Protocol::from_prefix("link"), Protocol::Link);
        assert!(Protocol::Link.is_local_path());
        assert!(!Protocol::Workspace.is_local_path());
        assert_eq!(Protocol::from_prefix("github").as_str(), "github");
        assert_eq!(DependencyCategory::OptionalDependencies.to_string(), "optionalDependencies");
    }
}
