//! Per-file records persisted by the index store.

use crate::fingerprint::Fingerprint;

pub const RECORD_SCHEMA_VERSION: u32 = 1;
pub const RECORDS_DIR_NAME: &str = "records";
pub const RECORD_EXTENSION: &str = "rec";

/// Everything one extraction pass produced for a single file.
#[derive(Clone, Debug, PartialEq, Eq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[archive(check_bytes)]
pub struct FileRecord {
    pub path: String,
    pub content_hash: String,
    /// In extraction order.
    pub entries: Vec<StoredEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[archive(check_bytes)]
pub struct StoredEntry {
    pub key: String,
    /// A `MethodEntry` encoded with `MethodEntryExternalizer`.
    pub value: Vec<u8>,
}

/// File name of the record for the project-relative `path`.
///
/// Paths are hashed so arbitrary source paths map onto flat, portable names.
pub fn record_file_name(path: &str) -> String {
    format!("{}.{RECORD_EXTENSION}", Fingerprint::from_bytes(path))
}
