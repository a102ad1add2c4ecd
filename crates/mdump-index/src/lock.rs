use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use fs2::FileExt as _;
use parking_lot::Mutex;

use crate::error::{IndexError, Result};

/// Exclusive ownership of an index store directory.
///
/// `fs2` locks only exclude other processes on Unix, so paths held by this
/// process are tracked separately. Acquisition never blocks: a store that is
/// already open elsewhere is reported as [`IndexError::Locked`]. Released on
/// drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        let path = std::fs::canonicalize(path)?;

        if !held_paths().lock().insert(path.clone()) {
            return Err(IndexError::Locked { path });
        }

        if let Err(err) = file.try_lock_exclusive() {
            held_paths().lock().remove(&path);
            if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(IndexError::Locked { path });
            }
            return Err(err.into());
        }

        Ok(Self { file, path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        held_paths().lock().remove(&self.path);
    }
}

fn held_paths() -> &'static Mutex<HashSet<PathBuf>> {
    static HELD: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    HELD.get_or_init(|| Mutex::new(HashSet::new()))
}
