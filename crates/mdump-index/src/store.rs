use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use mdump_core::{MethodEntry, SearchScope, SourceFile};
use mdump_storage::{ArtifactKind, PersistedArchive, WriteCompression};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde::Serialize;

use crate::error::Result;
use crate::indexer::MethodIndexer;
use crate::lock::StoreLock;
use crate::metadata::{StoreMetadata, METADATA_FILE_NAME};
use crate::record::{
    record_file_name, FileRecord, StoredEntry, RECORDS_DIR_NAME, RECORD_EXTENSION,
    RECORD_SCHEMA_VERSION,
};

const LOCK_FILE_NAME: &str = ".lock";

/// Records whose archived payload reaches this size are zstd-compressed.
pub const DEFAULT_COMPRESSION_THRESHOLD: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub indexer_version: u32,
    pub compression: WriteCompression,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            indexer_version: MethodIndexer::VERSION,
            compression: WriteCompression::Auto {
                threshold: DEFAULT_COMPRESSION_THRESHOLD,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub files: usize,
    pub keys: usize,
    pub entries: usize,
    pub stale_files: usize,
}

#[derive(Debug)]
struct FileSlot {
    content_hash: String,
    /// Encoded entries in extraction order.
    entries: IndexMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct StoreState {
    files: BTreeMap<String, FileSlot>,
    key_files: BTreeMap<String, BTreeSet<String>>,
}

impl StoreState {
    fn insert(&mut self, path: String, slot: FileSlot) {
        self.remove(&path);
        for key in slot.entries.keys() {
            self.key_files
                .entry(key.clone())
                .or_default()
                .insert(path.clone());
        }
        self.files.insert(path, slot);
    }

    fn remove(&mut self, path: &str) -> bool {
        let Some(old) = self.files.remove(path) else {
            return false;
        };
        for key in old.entries.keys() {
            if let Some(files) = self.key_files.get_mut(key) {
                files.remove(path);
                if files.is_empty() {
                    self.key_files.remove(key);
                }
            }
        }
        true
    }
}

/// The persistent, file-granular method index.
///
/// Each indexed file owns one record on disk and one slot in memory. A file's
/// slot is replaced as a unit, so readers see either all of its old entries or
/// all of its new ones. Entry values stay encoded until a query asks for them.
///
/// ## Layout
/// ```text
/// <dir>/.lock
/// <dir>/metadata.json
/// <dir>/records/<sha256(path)>.rec
/// ```
#[derive(Debug)]
pub struct MethodIndexStore {
    dir: PathBuf,
    records_dir: PathBuf,
    options: StoreOptions,
    indexer: MethodIndexer,
    state: RwLock<StoreState>,
    /// Serializes persist-then-swap so disk and memory agree per file.
    write_gate: Mutex<()>,
    stale: Mutex<BTreeSet<String>>,
    rebuild_requested: AtomicBool,
    metadata: Mutex<StoreMetadata>,
    _lock: StoreLock,
}

impl MethodIndexStore {
    /// Opens (or creates) the store in `dir`.
    ///
    /// Persisted data written by a different indexer version, store schema,
    /// or mdump build is discarded and a full rebuild is flagged. Records
    /// that fail validation are deleted; their files simply look unindexed.
    pub fn open(dir: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let lock = StoreLock::acquire(&dir.join(LOCK_FILE_NAME))?;

        let records_dir = dir.join(RECORDS_DIR_NAME);
        let metadata_path = dir.join(METADATA_FILE_NAME);

        let existing = match StoreMetadata::load(&metadata_path) {
            Ok(existing) => existing,
            Err(err) => {
                tracing::warn!(
                    target: "mdump.index",
                    path = %metadata_path.display(),
                    error = %err,
                    "unreadable index metadata; discarding store"
                );
                None
            }
        };

        let (metadata, rebuild) = match existing {
            Some(meta) if meta.is_compatible(MethodIndexer::NAME, options.indexer_version) => {
                (meta, false)
            }
            previous => {
                if let Some(previous) = &previous {
                    tracing::info!(
                        target: "mdump.index",
                        dir = %dir.display(),
                        found_indexer_version = previous.indexer_version,
                        expected_indexer_version = options.indexer_version,
                        found_mdump_version = %previous.mdump_version,
                        "index store is incompatible; rebuilding"
                    );
                }
                reset_dir(&records_dir)?;
                let fresh = StoreMetadata::new(MethodIndexer::NAME, options.indexer_version);
                fresh.save(&metadata_path)?;
                (fresh, true)
            }
        };

        std::fs::create_dir_all(&records_dir)?;
        let state = load_records(&records_dir)?;

        tracing::debug!(
            target: "mdump.index",
            dir = %dir.display(),
            files = state.files.len(),
            keys = state.key_files.len(),
            "opened index store"
        );

        Ok(Self {
            dir,
            records_dir,
            options,
            indexer: MethodIndexer,
            state: RwLock::new(state),
            write_gate: Mutex::new(()),
            stale: Mutex::new(BTreeSet::new()),
            rebuild_requested: AtomicBool::new(rebuild),
            metadata: Mutex::new(metadata),
            _lock: lock,
        })
    }

    /// Persists metadata and releases the directory lock.
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    pub fn flush(&self) -> Result<()> {
        let mut metadata = self.metadata.lock();
        metadata.touch();
        metadata.save(&self.dir.join(METADATA_FILE_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn indexer(&self) -> &MethodIndexer {
        &self.indexer
    }

    pub fn indexer_version(&self) -> u32 {
        self.options.indexer_version
    }

    pub fn applies_to<F: SourceFile + ?Sized>(&self, file: &F) -> bool {
        self.indexer.applies_to(file)
    }

    /// Re-extracts `file` and replaces its previous contribution.
    ///
    /// Files the indexer does not apply to are removed from the store.
    /// Returns the number of entries now stored for the file.
    pub fn update_file<F: SourceFile + ?Sized>(&self, file: &F) -> Result<usize> {
        let path = file.path();
        if !self.indexer.applies_to(file) {
            self.remove_file(path)?;
            return Ok(0);
        }

        let extracted = self.indexer.extract(file);
        let mut entries = IndexMap::with_capacity(extracted.len());
        for (key, entry) in extracted {
            let value = mdump_storage::encode_entry(&entry)?;
            entries.insert(key, value);
        }

        let record = FileRecord {
            path: path.to_string(),
            content_hash: file.content_hash().to_string(),
            entries: entries
                .iter()
                .map(|(key, value)| StoredEntry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        };

        let count = entries.len();
        let slot = FileSlot {
            content_hash: record.content_hash.clone(),
            entries,
        };

        let _gate = self.write_gate.lock();
        mdump_storage::write_archive_atomic(
            &self.records_dir.join(record_file_name(path)),
            ArtifactKind::FileRecord,
            RECORD_SCHEMA_VERSION,
            &record,
            self.options.compression,
        )?;
        self.state.write().insert(path.to_string(), slot);
        self.stale.lock().remove(path);

        tracing::trace!(target: "mdump.index", path, entries = count, "indexed file");
        Ok(count)
    }

    /// Drops `path` from the store. Returns whether it was indexed.
    pub fn remove_file(&self, path: &str) -> Result<bool> {
        let _gate = self.write_gate.lock();
        match std::fs::remove_file(self.records_dir.join(record_file_name(path))) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        let removed = self.state.write().remove(path);
        self.stale.lock().remove(path);
        Ok(removed)
    }

    /// Discards every record, in memory and on disk, and flags a full rebuild.
    pub fn request_rebuild(&self) -> Result<()> {
        let _gate = self.write_gate.lock();
        *self.state.write() = StoreState::default();
        self.stale.lock().clear();
        self.rebuild_requested.store(true, Ordering::SeqCst);
        reset_dir(&self.records_dir)?;
        std::fs::create_dir_all(&self.records_dir)?;

        tracing::info!(
            target: "mdump.index",
            dir = %self.dir.display(),
            "index rebuild requested"
        );
        Ok(())
    }

    /// Whether every applicable file has to be extracted again, either because
    /// persisted data was discarded on open or a rebuild was requested.
    pub fn needs_full_rebuild(&self) -> bool {
        self.rebuild_requested.load(Ordering::SeqCst)
    }

    /// Clears the rebuild flag, returning its previous value.
    pub fn take_rebuild_request(&self) -> bool {
        self.rebuild_requested.swap(false, Ordering::SeqCst)
    }

    /// Files whose stored entries failed to decode since the last call.
    pub fn take_stale_files(&self) -> BTreeSet<String> {
        std::mem::take(&mut *self.stale.lock())
    }

    pub fn indexed_files(&self) -> Vec<String> {
        self.state.read().files.keys().cloned().collect()
    }

    pub fn content_hash(&self, path: &str) -> Option<String> {
        self.state
            .read()
            .files
            .get(path)
            .map(|slot| slot.content_hash.clone())
    }

    /// Whether `path` is indexed from contents with `content_hash` and none
    /// of its entries are known to be unreadable.
    pub fn is_up_to_date(&self, path: &str, content_hash: &str) -> bool {
        let fresh = self
            .state
            .read()
            .files
            .get(path)
            .is_some_and(|slot| slot.content_hash == content_hash);
        fresh && !self.stale.lock().contains(path)
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            files: state.files.len(),
            keys: state.key_files.len(),
            entries: state.files.values().map(|slot| slot.entries.len()).sum(),
            stale_files: self.stale.lock().len(),
        }
    }

    /// Opens a read scope. Writers wait for it to be dropped before swapping
    /// any file's entries, so every answer within one view is consistent.
    pub fn read(&self) -> StoreView<'_> {
        StoreView {
            state: self.state.read(),
            stale: &self.stale,
        }
    }

    pub fn all_keys(&self) -> Vec<String> {
        self.read().all_keys().map(str::to_string).collect()
    }

    pub fn files_containing(&self, key: &str, scope: &SearchScope) -> Vec<String> {
        self.read()
            .files_containing(key, scope)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn values_for(&self, key: &str, scope: &SearchScope) -> Vec<MethodEntry> {
        self.read().values_for(key, scope)
    }
}

/// A consistent read-only view of the store.
pub struct StoreView<'a> {
    state: RwLockReadGuard<'a, StoreState>,
    stale: &'a Mutex<BTreeSet<String>>,
}

impl StoreView<'_> {
    /// Every key in the store, ascending, regardless of scope.
    pub fn all_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.state.key_files.keys().map(String::as_str)
    }

    /// Files in `scope` whose extraction produced `key`, ascending.
    pub fn files_containing(&self, key: &str, scope: &SearchScope) -> Vec<&str> {
        self.state
            .key_files
            .get(key)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(|path| scope.contains(path))
            .collect()
    }

    /// Entries stored under `key` by files in `scope`, in file order.
    ///
    /// Values that fail to decode are skipped and their file is marked stale
    /// so the next refresh re-extracts it.
    pub fn values_for(&self, key: &str, scope: &SearchScope) -> Vec<MethodEntry> {
        let mut out = Vec::new();
        for path in self.files_containing(key, scope) {
            let Some(bytes) = self
                .state
                .files
                .get(path)
                .and_then(|slot| slot.entries.get(key))
            else {
                continue;
            };
            match mdump_storage::decode_entry(bytes) {
                Ok(entry) => out.push(entry),
                Err(err) => {
                    tracing::warn!(
                        target: "mdump.index",
                        path,
                        key,
                        error = %err,
                        "failed to decode stored entry; file queued for re-extraction"
                    );
                    self.stale.lock().insert(path.to_string());
                }
            }
        }
        out
    }

    pub fn file_count(&self) -> usize {
        self.state.files.len()
    }
}

fn reset_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn load_records(records_dir: &Path) -> Result<StoreState> {
    let mut state = StoreState::default();

    for dir_entry in std::fs::read_dir(records_dir)? {
        let path = dir_entry?.path();
        let is_record = path
            .extension()
            .is_some_and(|ext| ext == RECORD_EXTENSION);
        if !is_record {
            // Leftover temp files from interrupted writes.
            if path.is_file() {
                let _ = std::fs::remove_file(&path);
            }
            continue;
        }

        match load_record(&path) {
            Ok((file_path, slot)) => state.insert(file_path, slot),
            Err(reason) => {
                tracing::warn!(
                    target: "mdump.index",
                    path = %path.display(),
                    reason = %reason,
                    "discarding unreadable index record"
                );
                let _ = std::fs::remove_file(&path);
            }
        }
    }

    Ok(state)
}

fn load_record(path: &Path) -> std::result::Result<(String, FileSlot), String> {
    let archive =
        PersistedArchive::<FileRecord>::open(path, ArtifactKind::FileRecord, RECORD_SCHEMA_VERSION)
            .map_err(|err| err.to_string())?;

    let file_path = archive.path.as_str().to_string();
    let expected_name = record_file_name(&file_path);
    if path.file_name().and_then(|name| name.to_str()) != Some(expected_name.as_str()) {
        return Err(format!("record for {file_path} stored under the wrong name"));
    }

    let mut entries = IndexMap::with_capacity(archive.entries.len());
    for stored in archive.entries.iter() {
        entries.insert(stored.key.as_str().to_string(), stored.value.as_slice().to_vec());
    }

    Ok((
        file_path,
        FileSlot {
            content_hash: archive.content_hash.as_str().to_string(),
            entries,
        },
    ))
}
