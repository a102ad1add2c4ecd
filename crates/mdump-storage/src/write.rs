use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::header::{ArtifactKind, Compression, StorageHeader};
use crate::persisted::{content_hash, StorageError};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteCompression {
    #[default]
    None,
    Zstd { level: i32 },
    /// Compress with zstd's default level once the archived payload reaches
    /// `threshold` bytes; store smaller payloads as-is.
    Auto { threshold: u64 },
}

impl WriteCompression {
    fn resolve(self, uncompressed_len: u64) -> Option<i32> {
        match self {
            Self::None => None,
            Self::Zstd { level } => Some(level),
            Self::Auto { threshold } if uncompressed_len >= threshold => Some(0),
            Self::Auto { .. } => None,
        }
    }
}

/// Serializes `value` with rkyv and atomically replaces `path` with the
/// header-prefixed archive.
pub fn write_archive_atomic<T>(
    path: &Path,
    kind: ArtifactKind,
    schema_version: u32,
    value: &T,
    compression: WriteCompression,
) -> Result<(), StorageError>
where
    T: rkyv::Archive + rkyv::Serialize<rkyv::ser::serializers::AllocSerializer<256>>,
{
    let archived =
        rkyv::to_bytes::<_, 256>(value).map_err(|e| StorageError::Validation(e.to_string()))?;
    let uncompressed = archived.as_slice();
    let uncompressed_len = uncompressed.len() as u64;
    let hash = content_hash(uncompressed);

    let (compression, payload) = match compression.resolve(uncompressed_len) {
        Some(level) => {
            let compressed = zstd::bulk::compress(uncompressed, level)
                .map_err(|e| StorageError::Compression(e.to_string()))?;
            (Compression::Zstd, std::borrow::Cow::Owned(compressed))
        }
        None => (Compression::None, std::borrow::Cow::Borrowed(uncompressed)),
    };

    let header = StorageHeader::new(
        kind,
        schema_version,
        compression,
        payload.len() as u64,
        uncompressed_len,
        hash,
    );

    atomic_write_with(path, |file| {
        file.write_all(&header.encode())?;
        file.write_all(&payload)
    })
}

/// Atomically replaces `path` with `bytes`.
///
/// Readers observe either the previous contents or the complete new contents,
/// never a partial write. Parent directories are created as needed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    atomic_write_with(path, |file| file.write_all(bytes))
}

/// Like [`atomic_write`], streaming the contents through `write`.
pub fn atomic_write_with(
    path: &Path,
    write: impl FnOnce(&mut fs::File) -> io::Result<()>,
) -> Result<(), StorageError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let (tmp_path, mut file) = open_unique_tmp_file(path, parent)?;
    let result = (|| {
        write(&mut file)?;
        file.sync_all()?;
        drop(file);
        rename_overwrite(&tmp_path, path)
    })();

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    sync_dir_best_effort(parent);
    Ok(())
}

fn rename_overwrite(tmp_path: &Path, dest: &Path) -> io::Result<()> {
    const MAX_ATTEMPTS: usize = 1024;
    let mut attempts = 0usize;

    loop {
        match fs::rename(tmp_path, dest) {
            Ok(()) => return Ok(()),
            // Windows refuses to rename over an existing file; concurrent
            // writers can race the remove, so keep retrying.
            Err(err)
                if cfg!(windows)
                    && (err.kind() == io::ErrorKind::AlreadyExists || dest.exists()) =>
            {
                match fs::remove_file(dest) {
                    Ok(()) => {}
                    Err(remove_err) if remove_err.kind() == io::ErrorKind::NotFound => {}
                    Err(remove_err) => return Err(remove_err),
                }
                attempts += 1;
                if attempts >= MAX_ATTEMPTS {
                    return Err(err);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

#[cfg(unix)]
fn sync_dir_best_effort(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir_best_effort(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_existing_file_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("out.json")]);
    }

    #[test]
    fn failed_write_keeps_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        atomic_write(&path, b"kept").unwrap();

        let err = atomic_write_with(&path, |file| {
            file.write_all(b"partial")?;
            Err(io::Error::other("boom"))
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));

        assert_eq!(fs::read(&path).unwrap(), b"kept");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn auto_compression_honors_threshold() {
        assert_eq!(WriteCompression::Auto { threshold: 10 }.resolve(9), None);
        assert_eq!(WriteCompression::Auto { threshold: 10 }.resolve(10), Some(0));
        assert_eq!(WriteCompression::Zstd { level: 3 }.resolve(1), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn rename_failure_propagates_without_touching_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.json");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("kept"), b"kept").unwrap();

        let err = atomic_write(&dest, b"new").unwrap_err();
        assert!(matches!(err, StorageError::Io(_)), "{err:?}");

        assert_eq!(fs::read(dest.join("kept")).unwrap(), b"kept");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
