//! Path arithmetic used by the satisfaction checks.
//!
//! Nothing here touches the filesystem: paths are compared structurally after
//! lexical normalization, and relative paths are anchored on the process
//! working directory.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path.
///
/// Drops `.` components and trailing separators and folds `..` into the
/// preceding normal component. Leading `..` on a relative path are kept;
/// `..` directly under the root is dropped.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Resolve a path against the current working directory and normalize it.
///
/// An empty path stands for the current directory.
///
/// # Errors
///
/// Returns an error if the working directory cannot be determined.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    Ok(normalize(&std::path::absolute(path)?))
}

/// Directory containing `file`, or `.` when it has no parent component.
#[must_use]
pub fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Check whether `path` is `root` or nested somewhere below it.
///
/// Both paths are compared component by component, so `/root-2` is not
/// inside `/root`. Callers are expected to pass normalized paths.
#[must_use]
pub fn is_within(path: &Path, root: &Path) -> bool {
    let mut path_components = path.components();
    root.components()
        .all(|root_component| path_components.next() == Some(root_component))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/ws/a/../bar")), PathBuf::from("/ws/bar"));
        assert_eq!(normalize(Path::new("/ws/./bar/")), PathBuf::from("/ws/bar"));
        assert_eq!(normalize(Path::new("a/b/../../..")), PathBuf::from(".."));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn absolutize_relative() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolutize(Path::new("sub/dir/")).unwrap(), cwd.join("sub/dir"));
        assert_eq!(absolutize(Path::new("")).unwrap(), normalize(&cwd));
        assert_eq!(
            absolutize(Path::new("/already/abs/./x")).unwrap(),
            PathBuf::from("/already/abs/x")
        );
    }

    #[test]
    fn parent_dir_of_bare_file() {
        assert_eq!(parent_dir(Path::new("package.json")), PathBuf::from("."));
        assert_eq!(
            parent_dir(Path::new("/ws/a/package.json")),
            PathBuf::from("/ws/a")
        );
    }

    #[test]
    fn within_is_component_aware() {
        let root = Path::new("/root");
        assert!(is_within(Path::new("/root"), root));
        assert!(is_within(Path::new("/root/pkg"), root));
        assert!(is_within(Path::new("/root/a/b/c"), root));
        assert!(!is_within(Path::new("/root-2"), root));
        assert!(!is_within(Path::new("/root-2/pkg"), root));
        assert!(!is_within(Path::new("/"), root));
        assert!(!is_within(Path::new("/other/root"), root));
    }
}
