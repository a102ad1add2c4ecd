use std::path::{Path, PathBuf};

use mdump_core::MethodEntry;
use mdump_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to serialize method snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write method snapshot to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

/// Pretty JSON array of `{ "name", "body" }` objects, in the given order.
pub fn render_snapshot(methods: &[MethodEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(methods)
}

/// Replaces `path` with the rendered snapshot, creating parent directories.
///
/// The file is written via a temp file and rename, so readers never observe
/// a partially written snapshot.
pub fn write_snapshot(methods: &[MethodEntry], path: &Path) -> Result<(), SnapshotError> {
    let json = render_snapshot(methods)?;
    mdump_storage::atomic_write(path, json.as_bytes()).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Notified after a snapshot lands on disk so views of the output directory
/// can pick up the change.
pub trait FileRefresher: Send + Sync {
    fn refresh(&self, dir: &Path);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRefresher;

impl FileRefresher for NoopRefresher {
    fn refresh(&self, _dir: &Path) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_is_an_empty_array() {
        assert_eq!(render_snapshot(&[]).unwrap(), "[]");
    }

    #[test]
    fn snapshot_layout_is_pretty_printed() {
        let json = render_snapshot(&[MethodEntry::new("bar", "{ return \"x\"; }")]).unwrap();
        assert_eq!(
            json,
            "[\n  {\n    \"name\": \"bar\",\n    \"body\": \"{ return \\\"x\\\"; }\"\n  }\n]"
        );
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/methods.json");
        write_snapshot(&[MethodEntry::new("m", "{}")], &path).unwrap();

        let parsed: Vec<MethodEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, vec![MethodEntry::new("m", "{}")]);
    }

    #[test]
    fn write_into_a_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let err = write_snapshot(&[], &blocker.join("methods.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Write { .. }), "{err}");
    }
}
