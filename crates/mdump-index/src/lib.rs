//! The incremental method index.
//!
//! [`MethodIndexer`] turns one parsed source file into keyed
//! [`MethodEntry`](mdump_core::MethodEntry) values, [`MethodIndexStore`]
//! persists them per file and keeps the inverse key-to-files map, and
//! [`collect`] aggregates a sorted view over a [`SearchScope`](mdump_core::SearchScope).

mod error;
mod fingerprint;
mod indexer;
mod lock;
mod metadata;
mod query;
mod record;
mod store;

pub use error::{IndexError, Result};
pub use fingerprint::Fingerprint;
pub use indexer::MethodIndexer;
pub use lock::StoreLock;
pub use metadata::{StoreMetadata, METADATA_FILE_NAME, STORE_SCHEMA_VERSION};
pub use query::collect;
pub use record::{
    record_file_name, FileRecord, StoredEntry, RECORDS_DIR_NAME, RECORD_SCHEMA_VERSION,
};
pub use store::{
    MethodIndexStore, StoreOptions, StoreStats, StoreView, DEFAULT_COMPRESSION_THRESHOLD,
};
