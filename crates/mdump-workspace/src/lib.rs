//! A Java project directory wired to a persistent method index.
//!
//! [`Workspace::refresh`] walks the project for `.java` files and re-indexes
//! only what changed since the last run (or everything, after a rebuild was
//! flagged). Extraction runs on the [`IndexScheduler`] pool; callers wait for
//! it through [`IndexReadiness`](mdump_core::IndexReadiness) before querying.

pub mod java_outline;
mod scheduler;
mod service;
mod snapshot;
mod trigger;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use mdump_config::MdumpConfig;
use mdump_core::normalize_rel_path;
use mdump_index::{Fingerprint, MethodIndexStore, MethodIndexer, StoreOptions, StoreStats};
use mdump_storage::WriteCompression;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

pub use scheduler::{default_indexing_threads, IndexScheduler};
pub use service::MethodDumpService;
pub use snapshot::{render_snapshot, write_snapshot, FileRefresher, NoopRefresher, SnapshotError};
pub use trigger::{
    run_manual_dump, run_startup_dump, spawn_manual_dump, DumpOutcome, DumpRequest,
    NotificationKind, Notifier, TracingNotifier, NOTIFICATION_GROUP,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub files_scanned: usize,
    pub files_scheduled: usize,
    pub files_removed: usize,
    pub full_rebuild: bool,
}

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: MdumpConfig,
    store: Arc<MethodIndexStore>,
    scheduler: IndexScheduler,
    service: Arc<MethodDumpService>,
}

impl Workspace {
    /// Opens the workspace containing `path` (a directory, or a file whose
    /// parent becomes the root) and its index store.
    pub fn open(path: impl AsRef<Path>, config: &MdumpConfig) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path)
            .with_context(|| format!("failed to read metadata for {}", path.display()))?;
        let root = if meta.is_dir() {
            path.to_path_buf()
        } else {
            path.parent()
                .map(|p| p.to_path_buf())
                .context("file path has no parent directory")?
        };
        let root = fs::canonicalize(&root).unwrap_or(root);

        let store_dir = config.index.resolve_dir(&root);
        let options = StoreOptions {
            indexer_version: MethodIndexer::VERSION,
            compression: WriteCompression::Auto {
                threshold: config.index.compression_threshold_bytes,
            },
        };
        let store = MethodIndexStore::open(&store_dir, options)
            .with_context(|| format!("failed to open method index at {}", store_dir.display()))?;
        let store = Arc::new(store);

        let threads = config
            .index
            .threads
            .unwrap_or_else(default_indexing_threads);
        let scheduler = IndexScheduler::new(threads);

        let project_name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let service = MethodDumpService::new(Arc::clone(&store), Some(root.clone()), project_name)
            .with_output(config.dump.resolve_output(&root));

        tracing::debug!(
            target: "mdump.workspace",
            root = %root.display(),
            store = %store_dir.display(),
            threads,
            "opened workspace"
        );

        Ok(Self {
            root,
            config: config.clone(),
            store,
            scheduler,
            service: Arc::new(service),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &MdumpConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MethodIndexStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &IndexScheduler {
        &self.scheduler
    }

    pub fn service(&self) -> &Arc<MethodDumpService> {
        &self.service
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Project-relative paths of every `.java` file, sorted. Hidden
    /// directories (including `.mdump`) are skipped, as are entries that
    /// cannot be read.
    pub fn java_files(&self) -> Vec<(String, PathBuf)> {
        self.scan_java_files().files
    }

    fn scan_java_files(&self) -> JavaScan {
        let mut scan = JavaScan::default();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(
                        target: "mdump.workspace",
                        path = ?err.path(),
                        error = %err,
                        "skipping unreadable entry"
                    );
                    // An empty prefix (the root, or no path at all) covers
                    // every file.
                    let rel = err
                        .path()
                        .and_then(|path| normalize_rel_path(&self.root, path))
                        .unwrap_or_default();
                    scan.unreadable.push(rel);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("java") {
                continue;
            }
            if let Some(rel) = normalize_rel_path(&self.root, path) {
                scan.files.push((rel, path.to_path_buf()));
            }
        }
        scan.files.sort();
        scan
    }

    /// Brings the index in line with the files on disk.
    ///
    /// New, modified and stale files are queued for extraction; files that
    /// disappeared are dropped from the index right away. Returns once the
    /// jobs are queued; use [`wait_until_indexed`](Self::wait_until_indexed)
    /// (or the scheduler's readiness) to wait for them.
    ///
    /// The scheduler is marked configured even when the refresh fails, so
    /// startup waiters are never stranded.
    pub fn refresh(&self) -> Result<RefreshReport> {
        let result = self.refresh_inner();
        self.scheduler.mark_configured();
        result
    }

    fn refresh_inner(&self) -> Result<RefreshReport> {
        let mut scan = self.scan_java_files();
        let full_rebuild = self.store.take_rebuild_request();
        let stale = self.store.take_stale_files();

        let mut report = RefreshReport {
            files_scanned: scan.files.len(),
            full_rebuild,
            ..RefreshReport::default()
        };

        let mut seen = BTreeSet::new();
        for (rel, abs) in std::mem::take(&mut scan.files) {
            seen.insert(rel.clone());

            if !full_rebuild && !stale.contains(&rel) {
                match Fingerprint::from_file(&abs) {
                    Ok(hash) if self.store.is_up_to_date(&rel, hash.as_str()) => continue,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(
                            target: "mdump.workspace",
                            path = %abs.display(),
                            error = %err,
                            "failed to read source file"
                        );
                        continue;
                    }
                }
            }

            report.files_scheduled += 1;
            let store = Arc::clone(&self.store);
            self.scheduler
                .submit(move || index_file(&store, &rel, &abs));
        }

        for indexed in self.store.indexed_files() {
            // Files below an unreadable directory may still exist.
            if seen.contains(&indexed) || scan.is_unreadable(&indexed) {
                continue;
            }
            match self.store.remove_file(&indexed) {
                Ok(true) => report.files_removed += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(
                    target: "mdump.workspace",
                    path = %indexed,
                    error = %err,
                    "failed to drop deleted file from index"
                ),
            }
        }

        tracing::info!(
            target: "mdump.workspace",
            scanned = report.files_scanned,
            scheduled = report.files_scheduled,
            removed = report.files_removed,
            full_rebuild = report.full_rebuild,
            "workspace refresh queued"
        );
        Ok(report)
    }

    pub fn wait_until_indexed(&self) {
        self.scheduler.wait_idle();
    }

    /// Discards all indexed data; the next [`refresh`](Self::refresh)
    /// re-extracts every file.
    pub fn request_rebuild(&self) -> Result<()> {
        self.scheduler.wait_idle();
        self.store
            .request_rebuild()
            .context("failed to reset method index")
    }

    /// Waits for outstanding jobs, persists store metadata and releases the
    /// store lock.
    pub fn close(self) -> Result<()> {
        self.scheduler.wait_idle();
        let Self { store, service, .. } = self;
        drop(service);
        match Arc::try_unwrap(store) {
            Ok(store) => store.close()?,
            Err(shared) => shared.flush()?,
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct JavaScan {
    files: Vec<(String, PathBuf)>,
    unreadable: Vec<String>,
}

impl JavaScan {
    fn is_unreadable(&self, rel: &str) -> bool {
        self.unreadable.iter().any(|dir| {
            dir.is_empty()
                || rel == dir
                || rel
                    .strip_prefix(dir.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn index_file(store: &MethodIndexStore, rel: &str, abs: &Path) {
    let bytes = match fs::read(abs) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                target: "mdump.workspace",
                path = %abs.display(),
                error = %err,
                "failed to read source file"
            );
            return;
        }
    };

    let hash = Fingerprint::from_bytes(&bytes);
    let text = String::from_utf8_lossy(&bytes);
    let file = java_outline::parse_source_file(rel, &text, hash.into_string());
    match store.update_file(&file) {
        Ok(entries) => tracing::trace!(
            target: "mdump.workspace",
            path = rel,
            entries,
            "indexed file"
        ),
        Err(err) => tracing::warn!(
            target: "mdump.workspace",
            path = rel,
            error = %err,
            "failed to index file"
        ),
    }
}
