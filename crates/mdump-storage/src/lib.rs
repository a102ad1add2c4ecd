//! On-disk building blocks for the mdump index.
//!
//! ## Record archives
//! Each archive is a fixed 64-byte little-endian header followed by an `rkyv`
//! payload, optionally zstd-compressed as a whole. The header records the
//! artifact kind, schema version, mdump version, target endianness and
//! pointer width; any mismatch makes the artifact incompatible and the caller
//! is expected to rebuild it. The payload carries a blake3-derived content
//! hash so torn or bit-flipped files are rejected instead of misread.
//!
//! ## Entry values
//! [`MethodEntryExternalizer`] is the compact length-prefixed codec used for
//! the values inside a record.
//!
//! ## Atomic files
//! [`atomic_write`] is shared by every writer that replaces a file readers
//! may be looking at (records, store metadata, JSON snapshots).

mod externalizer;
mod header;
mod persisted;
mod write;

pub use externalizer::{decode_entry, encode_entry, DataExternalizer, MethodEntryExternalizer};
pub use header::{ArtifactKind, Compression, StorageHeader, HEADER_LEN};
pub use persisted::{CheckableArchived, PersistedArchive, StorageError};
pub use write::{atomic_write, atomic_write_with, write_archive_atomic, WriteCompression};
