use std::path::{Path, PathBuf};
use std::sync::Arc;

use mdump_config::MDUMP_DIR_NAME;
use mdump_core::{MethodEntry, SearchScope};
use mdump_index::MethodIndexStore;

use crate::snapshot::{self, FileRefresher, NoopRefresher, SnapshotError};

const DUMP_DIR_NAME: &str = "method-dump";
const DUMP_FILE_NAME: &str = "methods.json";

/// Per-project facade over the method index: collect entries and write them
/// out as a JSON snapshot.
pub struct MethodDumpService {
    store: Arc<MethodIndexStore>,
    project_root: Option<PathBuf>,
    project_name: String,
    output: Option<PathBuf>,
    refresher: Arc<dyn FileRefresher>,
}

impl std::fmt::Debug for MethodDumpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDumpService")
            .field("store", &self.store.dir())
            .field("project_root", &self.project_root)
            .field("project_name", &self.project_name)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl MethodDumpService {
    pub fn new(
        store: Arc<MethodIndexStore>,
        project_root: Option<PathBuf>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            project_root,
            project_name: project_name.into(),
            output: None,
            refresher: Arc::new(NoopRefresher),
        }
    }

    /// Uses `output` instead of [`default_output_path`](Self::default_output_path)
    /// when no explicit path is passed to [`dump_methods_to_json`](Self::dump_methods_to_json).
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn FileRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn store(&self) -> &Arc<MethodIndexStore> {
        &self.store
    }

    /// All indexed methods in `scope`, sorted by name.
    pub fn collect_methods(&self, scope: &SearchScope) -> Vec<MethodEntry> {
        mdump_index::collect(&self.store, scope)
    }

    /// Writes `methods` as a snapshot and returns where it was written.
    ///
    /// The destination is `output`, else the configured output, else
    /// [`default_output_path`](Self::default_output_path). The file is
    /// replaced atomically and the refresher is told about its directory.
    pub fn dump_methods_to_json(
        &self,
        methods: &[MethodEntry],
        output: Option<&Path>,
    ) -> Result<PathBuf, SnapshotError> {
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => self
                .output
                .clone()
                .unwrap_or_else(|| self.default_output_path()),
        };

        snapshot::write_snapshot(methods, &path)?;
        if let Some(parent) = path.parent() {
            self.refresher.refresh(parent);
        }

        tracing::info!(
            target: "mdump.workspace",
            path = %path.display(),
            methods = methods.len(),
            "wrote method snapshot"
        );
        Ok(path)
    }

    /// `<root>/.mdump/method-dump/methods.json`, or the same layout under
    /// `<tmp>/<project name>` for projects without a root directory.
    pub fn default_output_path(&self) -> PathBuf {
        let base = match &self.project_root {
            Some(root) => root.clone(),
            None => std::env::temp_dir().join(&self.project_name),
        };
        base.join(MDUMP_DIR_NAME)
            .join(DUMP_DIR_NAME)
            .join(DUMP_FILE_NAME)
    }
}
