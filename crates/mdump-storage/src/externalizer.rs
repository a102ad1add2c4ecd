//! Binary codec for values stored in the method index.
//!
//! A [`MethodEntry`] is written as its `name` followed by its `body`, each as
//! a little-endian `u32` byte length and the UTF-8 bytes. Strings longer than
//! `u32::MAX` bytes are rejected on write.

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use mdump_core::MethodEntry;

use crate::persisted::StorageError;

/// Serializes and deserializes index values to and from byte streams.
pub trait DataExternalizer<T> {
    fn save<W: Write + ?Sized>(&self, out: &mut W, value: &T) -> io::Result<()>;

    fn read<R: Read + ?Sized>(&self, input: &mut R) -> io::Result<T>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MethodEntryExternalizer;

impl DataExternalizer<MethodEntry> for MethodEntryExternalizer {
    fn save<W: Write + ?Sized>(&self, out: &mut W, value: &MethodEntry) -> io::Result<()> {
        write_string(out, &value.name)?;
        write_string(out, &value.body)
    }

    fn read<R: Read + ?Sized>(&self, input: &mut R) -> io::Result<MethodEntry> {
        let name = read_string(input)?;
        let body = read_string(input)?;
        Ok(MethodEntry { name, body })
    }
}

fn write_string<W: Write + ?Sized>(out: &mut W, value: &str) -> io::Result<()> {
    let len = u32::try_from(value.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("string of {} bytes exceeds the u32 length prefix", value.len()),
        )
    })?;
    out.write_u32::<LittleEndian>(len)?;
    out.write_all(value.as_bytes())
}

fn read_string<R: Read + ?Sized>(input: &mut R) -> io::Result<String> {
    let len = u64::from(input.read_u32::<LittleEndian>()?);
    // Grow the buffer as bytes arrive so a corrupt length cannot force a huge
    // up-front allocation.
    let mut buf = Vec::new();
    (&mut *input).take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {len} string bytes, found {}", buf.len()),
        ));
    }
    String::from_utf8(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Encodes one entry into a standalone byte buffer.
pub fn encode_entry(entry: &MethodEntry) -> Result<Vec<u8>, StorageError> {
    let mut out = Vec::with_capacity(8 + entry.name.len() + entry.body.len());
    MethodEntryExternalizer.save(&mut out, entry)?;
    Ok(out)
}

/// Decodes a buffer produced by [`encode_entry`].
///
/// The whole buffer must be consumed; truncated input, invalid UTF-8 and
/// trailing bytes are all reported as [`StorageError::InvalidValue`].
pub fn decode_entry(bytes: &[u8]) -> Result<MethodEntry, StorageError> {
    let mut cursor = Cursor::new(bytes);
    let entry = MethodEntryExternalizer
        .read(&mut cursor)
        .map_err(|err| StorageError::InvalidValue(err.to_string()))?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(StorageError::InvalidValue(format!(
            "{} trailing bytes after entry",
            bytes.len() - consumed
        )));
    }
    Ok(entry)
}
