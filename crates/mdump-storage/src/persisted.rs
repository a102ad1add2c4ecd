use std::fs::File;
use std::marker::PhantomData;
use std::ops::Deref;
use std::path::Path;
use std::ptr::NonNull;

use mdump_core::Endian;
use memmap2::{Mmap, MmapOptions};
use rkyv::Deserialize;
use thiserror::Error;

use crate::header::{ArtifactKind, Compression, StorageHeader, HEADER_LEN};

/// Archived roots that `rkyv` can validate before we hand out references.
pub trait CheckableArchived:
    for<'a> rkyv::bytecheck::CheckBytes<rkyv::validation::validators::DefaultValidator<'a>>
{
}

impl<T> CheckableArchived for T where
    T: for<'a> rkyv::bytecheck::CheckBytes<rkyv::validation::validators::DefaultValidator<'a>>
{
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
    #[error("incompatible artifact kind: expected {expected:?}, found {found:?}")]
    WrongArtifact {
        expected: ArtifactKind,
        found: ArtifactKind,
    },
    #[error("incompatible schema version: expected {expected}, found {found}")]
    WrongSchema { expected: u32, found: u32 },
    #[error("incompatible mdump version: expected {expected}, found {found}")]
    WrongMdumpVersion { expected: String, found: String },
    #[error("incompatible target endian: expected {expected:?}, found {found:?}")]
    WrongEndian { expected: Endian, found: Endian },
    #[error("incompatible pointer width: expected {expected}, found {found}")]
    WrongPointerWidth { expected: u8, found: u8 },
    #[error("truncated file: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("invalid payload alignment: required {required} bytes, got {got}")]
    Misaligned { required: usize, got: usize },
    #[error("archive validation failed: {0}")]
    Validation(String),
    #[error("compression failed: {0}")]
    Compression(String),
    #[error("unsupported compression tag {0}")]
    UnsupportedCompression(u8),
    #[error("payload size {payload_len} does not fit into addressable memory")]
    OversizedPayload { payload_len: u64 },
    #[error("payload hash mismatch: expected {expected}, found {found}")]
    HashMismatch { expected: u64, found: u64 },
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

enum Backing {
    Mmap {
        mmap: Mmap,
        offset: usize,
        len: usize,
    },
    Owned(rkyv::util::AlignedVec),
}

impl Backing {
    fn payload(&self) -> &[u8] {
        match self {
            Backing::Mmap { mmap, offset, len } => &mmap[*offset..*offset + *len],
            Backing::Owned(bytes) => bytes.as_slice(),
        }
    }
}

/// A validated `rkyv` archive read from disk.
///
/// Uncompressed payloads are served straight from an mmap; compressed ones
/// (or files that cannot be mapped) are decoded into an aligned buffer.
/// Opening never yields a partially valid value: the header, content hash
/// and archive layout are all checked first.
pub struct PersistedArchive<T>
where
    T: rkyv::Archive,
{
    header: StorageHeader,
    backing: Backing,
    root: NonNull<rkyv::Archived<T>>,
    _marker: PhantomData<T>,
}

impl<T> std::fmt::Debug for PersistedArchive<T>
where
    T: rkyv::Archive,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedArchive")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl<T> PersistedArchive<T>
where
    T: rkyv::Archive,
    rkyv::Archived<T>: CheckableArchived,
{
    pub fn header(&self) -> &StorageHeader {
        &self.header
    }

    pub fn archived(&self) -> &rkyv::Archived<T> {
        // Safety: `root` was produced by `rkyv::check_archived_root` over
        // `backing`, which lives as long as `self` and is never mutated.
        unsafe { self.root.as_ref() }
    }

    /// Deserializes the archived root into an owned value.
    pub fn to_owned(&self) -> Result<T, StorageError>
    where
        rkyv::Archived<T>: rkyv::Deserialize<T, rkyv::de::deserializers::SharedDeserializeMap>,
    {
        let mut deserializer = rkyv::de::deserializers::SharedDeserializeMap::default();
        self.archived()
            .deserialize(&mut deserializer)
            .map_err(|e| StorageError::Validation(e.to_string()))
    }

    /// Like [`PersistedArchive::open`], but a missing file is `Ok(None)`.
    pub fn open_optional(
        path: &Path,
        kind: ArtifactKind,
        schema_version: u32,
    ) -> Result<Option<Self>, StorageError> {
        match Self::open(path, kind, schema_version) {
            Ok(archive) => Ok(Some(archive)),
            Err(StorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn open(path: &Path, kind: ArtifactKind, schema_version: u32) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len() as usize;
        if file_len < HEADER_LEN {
            return Err(StorageError::Truncated {
                expected: HEADER_LEN,
                found: file_len,
            });
        }

        // Safety: record files are only ever replaced via rename, never
        // rewritten in place, so the mapped bytes stay stable.
        match unsafe { MmapOptions::new().map(&file) } {
            Ok(mmap) => Self::from_mmap(mmap, kind, schema_version),
            Err(err) => {
                tracing::debug!(
                    target: "mdump.storage",
                    path = %path.display(),
                    error = %err,
                    "mmap failed; reading archive into memory"
                );
                let bytes = std::fs::read(path)?;
                Self::from_bytes(&bytes, kind, schema_version)
            }
        }
    }

    fn from_mmap(mmap: Mmap, kind: ArtifactKind, schema_version: u32) -> Result<Self, StorageError> {
        let header = StorageHeader::decode(&mmap[..HEADER_LEN])?;
        check_header(&header, kind, schema_version)?;
        let (offset, len) = payload_bounds(&header, mmap.len())?;

        let backing = match header.compression {
            Compression::None => Backing::Mmap { mmap, offset, len },
            Compression::Zstd => {
                let decompressed = decompress(&mmap[offset..offset + len], header.uncompressed_len)?;
                Backing::Owned(aligned(&decompressed))
            }
        };
        Self::validate(header, backing)
    }

    fn from_bytes(bytes: &[u8], kind: ArtifactKind, schema_version: u32) -> Result<Self, StorageError> {
        let header = StorageHeader::decode(bytes)?;
        check_header(&header, kind, schema_version)?;
        let (offset, len) = payload_bounds(&header, bytes.len())?;

        let payload = &bytes[offset..offset + len];
        let backing = match header.compression {
            Compression::None => Backing::Owned(aligned(payload)),
            Compression::Zstd => {
                Backing::Owned(aligned(&decompress(payload, header.uncompressed_len)?))
            }
        };
        Self::validate(header, backing)
    }

    fn validate(header: StorageHeader, backing: Backing) -> Result<Self, StorageError> {
        let payload = backing.payload();

        let required = std::mem::align_of::<rkyv::Archived<T>>();
        let got = payload.as_ptr() as usize;
        if got % required != 0 {
            return Err(StorageError::Misaligned { required, got });
        }

        if payload.len() as u64 != header.uncompressed_len {
            return Err(StorageError::InvalidHeader("uncompressed length mismatch"));
        }

        let found = content_hash(payload);
        if found != header.content_hash {
            return Err(StorageError::HashMismatch {
                expected: header.content_hash,
                found,
            });
        }

        let root = rkyv::check_archived_root::<T>(payload)
            .map_err(|e| StorageError::Validation(e.to_string()))?;
        let root = NonNull::from(root);

        Ok(Self {
            header,
            backing,
            root,
            _marker: PhantomData,
        })
    }
}

impl<T> Deref for PersistedArchive<T>
where
    T: rkyv::Archive,
    rkyv::Archived<T>: CheckableArchived,
{
    type Target = rkyv::Archived<T>;

    fn deref(&self) -> &Self::Target {
        self.archived()
    }
}

// Safety: the archive only hands out shared references into an immutable
// buffer (mmap or owned) that lives as long as `self`.
unsafe impl<T> Send for PersistedArchive<T>
where
    T: rkyv::Archive,
    rkyv::Archived<T>: Sync,
{
}

unsafe impl<T> Sync for PersistedArchive<T>
where
    T: rkyv::Archive,
    rkyv::Archived<T>: Sync,
{
}

fn check_header(
    header: &StorageHeader,
    kind: ArtifactKind,
    schema_version: u32,
) -> Result<(), StorageError> {
    if header.kind != kind {
        return Err(StorageError::WrongArtifact {
            expected: kind,
            found: header.kind,
        });
    }
    if header.schema_version != schema_version {
        return Err(StorageError::WrongSchema {
            expected: schema_version,
            found: header.schema_version,
        });
    }
    if header.mdump_version != mdump_core::MDUMP_VERSION {
        return Err(StorageError::WrongMdumpVersion {
            expected: mdump_core::MDUMP_VERSION.to_string(),
            found: header.mdump_version.clone(),
        });
    }
    let endian = mdump_core::target_endian();
    if header.endian != endian {
        return Err(StorageError::WrongEndian {
            expected: endian,
            found: header.endian,
        });
    }
    let pointer_width = mdump_core::target_pointer_width();
    if header.pointer_width != pointer_width {
        return Err(StorageError::WrongPointerWidth {
            expected: pointer_width,
            found: header.pointer_width,
        });
    }
    if header.payload_offset != HEADER_LEN as u64 {
        return Err(StorageError::InvalidHeader("unexpected payload offset"));
    }
    Ok(())
}

fn payload_bounds(header: &StorageHeader, file_len: usize) -> Result<(usize, usize), StorageError> {
    let offset = header.payload_offset as usize;
    let len: usize = header
        .payload_len
        .try_into()
        .map_err(|_| StorageError::OversizedPayload {
            payload_len: header.payload_len,
        })?;
    let end = offset
        .checked_add(len)
        .ok_or(StorageError::InvalidHeader("payload offset overflow"))?;
    if file_len < end {
        return Err(StorageError::Truncated {
            expected: end,
            found: file_len,
        });
    }
    Ok((offset, len))
}

/// Streams the zstd frame into a buffer that grows with the decoded bytes.
///
/// `uncompressed_len` comes from an unauthenticated header field, so it only
/// caps the read and is never used to size an allocation up front.
fn decompress(payload: &[u8], uncompressed_len: u64) -> Result<Vec<u8>, StorageError> {
    use std::io::Read as _;

    let decoder = zstd::stream::read::Decoder::with_buffer(payload)
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    let mut out = Vec::new();
    decoder
        .take(uncompressed_len.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    if out.len() as u64 != uncompressed_len {
        return Err(StorageError::InvalidHeader("uncompressed length mismatch"));
    }
    Ok(out)
}

fn aligned(bytes: &[u8]) -> rkyv::util::AlignedVec {
    let mut out = rkyv::util::AlignedVec::with_capacity(bytes.len());
    out.extend_from_slice(bytes);
    out
}

pub(crate) fn content_hash(payload: &[u8]) -> u64 {
    let hash = blake3::hash(payload);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}
