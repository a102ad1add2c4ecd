use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Bump whenever the store's directory layout or record format changes.
pub const STORE_SCHEMA_VERSION: u32 = 1;
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Versioning information persisted next to the records of an index store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub schema_version: u32,
    pub indexer_name: String,
    pub indexer_version: u32,
    pub mdump_version: String,
    pub created_at_millis: u64,
    pub last_updated_millis: u64,
}

impl StoreMetadata {
    pub fn new(indexer_name: &str, indexer_version: u32) -> Self {
        let now = now_millis();
        Self {
            schema_version: STORE_SCHEMA_VERSION,
            indexer_name: indexer_name.to_string(),
            indexer_version,
            mdump_version: mdump_core::MDUMP_VERSION.to_string(),
            created_at_millis: now,
            last_updated_millis: now,
        }
    }

    /// Whether records written under this metadata can be reused by an
    /// indexer with the given identity.
    pub fn is_compatible(&self, indexer_name: &str, indexer_version: u32) -> bool {
        self.schema_version == STORE_SCHEMA_VERSION
            && self.indexer_name == indexer_name
            && self.indexer_version == indexer_version
            && self.mdump_version == mdump_core::MDUMP_VERSION
    }

    pub fn touch(&mut self) {
        self.last_updated_millis = now_millis();
    }

    /// Returns `Ok(None)` when no metadata has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        mdump_storage::atomic_write(path, &json)?;
        Ok(())
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
