use byteorder::{ByteOrder, LittleEndian};
use mdump_core::Endian;

use crate::persisted::StorageError;

/// Size of the fixed header that precedes every archived payload.
pub const HEADER_LEN: usize = 64;

const MAGIC: [u8; 8] = *b"MDUMPREC";
const HEADER_FORMAT_VERSION: u16 = 1;
const VERSION_FIELD_LEN: usize = 12;

// Byte layout (little-endian):
//   0..8   magic
//   8..10  header format version
//  10..12  artifact kind
//  12..16  schema version
//  16..28  mdump version (UTF-8, NUL padded)
//  28      endianness
//  29      pointer width
//  30      compression
//  31      reserved
//  32..40  payload offset
//  40..48  payload length (as stored)
//  48..56  uncompressed payload length
//  56..64  content hash (first 8 bytes of blake3, over the uncompressed payload)

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ArtifactKind {
    /// One file's extracted method index record.
    FileRecord = 1,
}

impl ArtifactKind {
    fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::FileRecord),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Compression {
    None = 0,
    Zstd = 1,
}

impl Compression {
    fn from_u8(value: u8) -> Result<Self, StorageError> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Zstd),
            other => Err(StorageError::UnsupportedCompression(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageHeader {
    pub kind: ArtifactKind,
    pub schema_version: u32,
    pub mdump_version: String,
    pub endian: Endian,
    pub pointer_width: u8,
    pub compression: Compression,
    pub payload_offset: u64,
    pub payload_len: u64,
    pub uncompressed_len: u64,
    pub content_hash: u64,
}

impl StorageHeader {
    pub fn new(
        kind: ArtifactKind,
        schema_version: u32,
        compression: Compression,
        payload_len: u64,
        uncompressed_len: u64,
        content_hash: u64,
    ) -> Self {
        Self {
            kind,
            schema_version,
            mdump_version: mdump_core::MDUMP_VERSION.to_string(),
            endian: mdump_core::target_endian(),
            pointer_width: mdump_core::target_pointer_width(),
            compression,
            payload_offset: HEADER_LEN as u64,
            payload_len,
            uncompressed_len,
            content_hash,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..8].copy_from_slice(&MAGIC);
        LittleEndian::write_u16(&mut out[8..10], HEADER_FORMAT_VERSION);
        LittleEndian::write_u16(&mut out[10..12], self.kind as u16);
        LittleEndian::write_u32(&mut out[12..16], self.schema_version);

        // Versions longer than the field are truncated; the loader then sees a
        // mismatch and treats the artifact as incompatible.
        let version = self.mdump_version.as_bytes();
        let len = version.len().min(VERSION_FIELD_LEN);
        out[16..16 + len].copy_from_slice(&version[..len]);

        out[28] = self.endian as u8;
        out[29] = self.pointer_width;
        out[30] = self.compression as u8;
        LittleEndian::write_u64(&mut out[32..40], self.payload_offset);
        LittleEndian::write_u64(&mut out[40..48], self.payload_len);
        LittleEndian::write_u64(&mut out[48..56], self.uncompressed_len);
        LittleEndian::write_u64(&mut out[56..64], self.content_hash);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        if bytes.len() < HEADER_LEN {
            return Err(StorageError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        if bytes[0..8] != MAGIC {
            return Err(StorageError::InvalidHeader("bad magic"));
        }
        if LittleEndian::read_u16(&bytes[8..10]) != HEADER_FORMAT_VERSION {
            return Err(StorageError::InvalidHeader("unsupported header format"));
        }

        let kind = ArtifactKind::from_u16(LittleEndian::read_u16(&bytes[10..12]))
            .ok_or(StorageError::InvalidHeader("unknown artifact kind"))?;
        let schema_version = LittleEndian::read_u32(&bytes[12..16]);

        let version_field = &bytes[16..16 + VERSION_FIELD_LEN];
        let version_end = version_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VERSION_FIELD_LEN);
        let mdump_version = std::str::from_utf8(&version_field[..version_end])
            .map_err(|_| StorageError::InvalidHeader("version is not utf-8"))?
            .to_string();

        let endian =
            Endian::from_u8(bytes[28]).ok_or(StorageError::InvalidHeader("unknown endianness"))?;

        Ok(Self {
            kind,
            schema_version,
            mdump_version,
            endian,
            pointer_width: bytes[29],
            compression: Compression::from_u8(bytes[30])?,
            payload_offset: LittleEndian::read_u64(&bytes[32..40]),
            payload_len: LittleEndian::read_u64(&bytes[40..48]),
            uncompressed_len: LittleEndian::read_u64(&bytes[48..56]),
            content_hash: LittleEndian::read_u64(&bytes[56..64]),
        })
    }
}
