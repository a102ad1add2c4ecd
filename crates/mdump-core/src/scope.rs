use std::collections::BTreeSet;
use std::path::{Component, Path};

use globset::GlobSet;

/// A caller-specified subset of files a query is evaluated over.
///
/// Files are identified by project-relative paths using `/` separators (see
/// [`normalize_rel_path`]).
#[derive(Clone, Debug, Default)]
pub enum SearchScope {
    /// Every file known to the index.
    #[default]
    Everything,
    /// An explicit set of files.
    Files(BTreeSet<String>),
    /// Files under a directory prefix (`""` matches everything).
    Directory(String),
    /// Files matching any of the glob patterns.
    Globs(GlobSet),
}

impl SearchScope {
    pub fn files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Files(files.into_iter().map(Into::into).collect())
    }

    pub fn directory(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into().replace('\\', "/");
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self::Directory(prefix)
    }

    pub fn contains(&self, file: &str) -> bool {
        match self {
            Self::Everything => true,
            Self::Files(files) => files.contains(file),
            Self::Directory(prefix) => {
                prefix.is_empty()
                    || file
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Self::Globs(globs) => globs.is_match(file),
        }
    }
}

/// Normalizes `path` (relative to `root`) into a `/`-separated relative path.
///
/// Returns `None` when `path` is not under `root`.
pub fn normalize_rel_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};

    #[test]
    fn directory_scope_matches_whole_components() {
        let scope = SearchScope::directory("src/main/");
        assert!(scope.contains("src/main/Foo.java"));
        assert!(scope.contains("src/main/a/Bar.java"));
        assert!(!scope.contains("src/mainly/Foo.java"));
        assert!(!scope.contains("test/Foo.java"));
        assert!(SearchScope::directory("").contains("anything.java"));
    }

    #[test]
    fn file_and_glob_scopes() {
        let files = SearchScope::files(["A.java"]);
        assert!(files.contains("A.java"));
        assert!(!files.contains("B.java"));

        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("src/**/*.java").unwrap());
        let globs = SearchScope::Globs(builder.build().unwrap());
        assert!(globs.contains("src/a/B.java"));
        assert!(!globs.contains("test/B.java"));
    }

    #[test]
    fn normalize_rel_path_uses_forward_slashes() {
        let root = Path::new("/project");
        assert_eq!(
            normalize_rel_path(root, Path::new("/project/src/A.java")).as_deref(),
            Some("src/A.java")
        );
        assert_eq!(normalize_rel_path(root, Path::new("/elsewhere/A.java")), None);
        assert_eq!(normalize_rel_path(root, Path::new("/project")), None);
    }
}
