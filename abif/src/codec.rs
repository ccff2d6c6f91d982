//! Translation between ABIF bytes and a `Container`.
//!
//! A file starts with a 128 byte header: the signature, the version and the root directory entry, padded with zeros.
//! The root entry points to a contiguous block of directory entries, one per key. Each directory entry either carries
//! its value inline or points to it by absolute offset.

use crate::entry::{DirEntry, DIR_ENTRY_SIZE, INLINE_LIMIT};
use crate::error::{DecodeError, DecoderError, EncodeError};
use crate::value::{Container, ElementType, Key, Value};
use crate::{HEADER_LENGTH, HEADER_PADDING, ROOT_NAME, SIGNATURE, SUPPORTED_MAJOR_VERSION};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::collections::btree_map::{BTreeMap, Entry};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use tracing::{debug, trace, warn};

/// Used to encode a `Container`. Directory entries and out-of-line data are laid out in key order.
pub struct Encoder<'w, W: Write> {
    writer: &'w mut W,
}

impl<'w, W: Write> Encoder<'w, W> {

    /// Encode a container to the given writer. The resulting `usize` is the amount of bytes that got written.
    pub fn encode(container: &Container, writer: &'w mut W) -> Result<usize, EncodeError> {
        Self { writer }.encode_inner(container)
    }

    fn encode_inner(&mut self, container: &Container) -> Result<usize, EncodeError> {
        let version = Self::version(container)?;
        let num_elements = Self::to_i32(container.len())?;
        let dir_size = container.len().checked_mul(DIR_ENTRY_SIZE).ok_or(EncodeError::Length(container.len()))?;
        let root = DirEntry {
            name: *ROOT_NAME,
            number: 1,
            element_type: ElementType::Directory.code(),
            element_size: DIR_ENTRY_SIZE as i16,
            num_elements,
            data_size: Self::to_i32(dir_size)?,
            data_offset: HEADER_LENGTH as u32,
            data_handle: 0,
        };

        self.writer.write_all(SIGNATURE)?;
        self.writer.write_i16::<BigEndian>(version)?;
        let mut c = SIGNATURE.len() + 2;
        c += root.encode(self.writer)?;
        self.writer.write_all(&[0u8; HEADER_PADDING])?;
        c += HEADER_PADDING;

        let mut cursor = HEADER_LENGTH + dir_size;
        for (key, value) in container.iter() {
            let data_offset = if value.is_inline() {
                // Value::new normalizes inline payloads to four bytes
                debug_assert_eq!(INLINE_LIMIT, value.bytes().len());
                let mut inline = [0u8; INLINE_LIMIT];
                inline.copy_from_slice(value.bytes());
                u32::from_be_bytes(inline)
            } else {
                let offset = Self::to_i32(cursor)? as u32;
                cursor += value.bytes().len();
                offset
            };
            trace!(key = %key, element_type = %value.element_type(), data_offset, "writing directory entry");
            c += DirEntry {
                name: *key.name(),
                number: key.number(),
                element_type: value.element_type().code(),
                element_size: value.element_size(),
                num_elements: value.num_elements(),
                data_size: Self::to_i32(value.data_size())?,
                data_offset,
                data_handle: 0,
            }.encode(self.writer)?;
        }

        for value in container.entries.values().filter(|v| !v.is_inline()) {
            self.writer.write_all(value.bytes())?;
            c += value.bytes().len();
        }

        debug!(major = container.major_version, minor = container.minor_version, entries = container.len(), bytes = c, "encoded abif container");
        Ok(c)
    }

    fn version(container: &Container) -> Result<i16, EncodeError> {
        let (major, minor) = (container.major_version, container.minor_version);
        if major as i16 != SUPPORTED_MAJOR_VERSION || minor > 99 {
            return Err(EncodeError::Version { major, minor });
        }
        Ok(SUPPORTED_MAJOR_VERSION * 100 + minor as i16)
    }

    #[inline]
    fn to_i32(value: usize) -> Result<i32, EncodeError> {
        i32::try_from(value).map_err(|_| EncodeError::Length(value))
    }

}

/// Encode a container into a freshly allocated buffer
pub fn to_bytes(container: &Container) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    Encoder::encode(container, &mut buf)?;
    Ok(buf)
}

/// Used to decode a `Container` from a seekable source. Offsets within the file are absolute, so decoding always
/// starts at the beginning of the source regardless of its current position.
pub struct Decoder<'r, R: Read + Seek> {
    source: &'r mut R,
    pos: u64,
}

impl<'r, R: Read + Seek> Decoder<'r, R> {

    /// Decode a whole container. Either every entry is decoded or an error is returned which records the position
    /// within the source at which decoding failed.
    pub fn decode(source: &'r mut R) -> Result<Container, DecoderError> {
        let mut decoder = Self { source, pos: 0 };
        decoder.decode_container().map_err(|e| e.at(decoder.pos))
    }

    fn decode_container(&mut self) -> Result<Container, DecodeError> {
        self.seek(0)?;

        let mut signature = [0u8; 4];
        self.read_exact(&mut signature)?;
        if &signature != SIGNATURE {
            return Err(DecodeError::BadSignature(signature));
        }

        let version = self.source.read_i16::<BigEndian>()?;
        self.pos += 2;
        let major = version / 100;
        let minor = version - major * 100;
        if major != SUPPORTED_MAJOR_VERSION {
            return Err(DecodeError::UnsupportedVersion(major, minor));
        }

        let root = self.read_entry()?;
        // reserved, never interpreted
        self.read_exact(&mut [0u8; HEADER_PADDING])?;

        if root.nominal_size().is_none() {
            return Err(DecodeError::Length { element_size: root.element_size, num_elements: root.num_elements });
        }
        debug!(major, minor, entries = root.num_elements, directory = root.data_offset, "decoding abif container");

        let mut entries = BTreeMap::new();
        for i in 0..root.num_elements as u64 {
            self.seek(root.data_offset as u64 + i * root.element_size as u64)?;
            let entry = self.read_entry()?;
            let key = Key::verbatim(entry.name, entry.number);
            let value = self.read_value(&entry)?;
            trace!(key = %key, element_type = %value.element_type(), inline = value.is_inline(), "read directory entry");
            match entries.entry(key) {
                Entry::Vacant(slot) => { slot.insert(value); },
                Entry::Occupied(_)  => { return Err(DecodeError::DuplicateKey(key)); },
            }
        }

        Ok(Container { major_version: major as u16, minor_version: minor as u16, entries })
    }

    fn read_value(&mut self, entry: &DirEntry) -> Result<Value, DecodeError> {
        let nominal = entry.nominal_size()
            .ok_or(DecodeError::Length { element_size: entry.element_size, num_elements: entry.num_elements })?;
        if entry.data_size as i64 != nominal as i64 {
            warn!(data_size = entry.data_size, nominal, "directory entry data size disagrees with its element size and count");
        }
        let element_type = ElementType::from(entry.element_type);
        if nominal <= INLINE_LIMIT {
            return Ok(Value::from_wire(element_type, entry.element_size, entry.num_elements, entry.inline_bytes().to_vec()));
        }

        let offset = entry.data_offset as u64;
        self.seek(offset)?;
        let mut bytes = Vec::new();
        let actual = self.source.by_ref().take(nominal as u64).read_to_end(&mut bytes)?;
        self.pos += actual as u64;
        if actual != nominal {
            return Err(DecodeError::TruncatedData { offset, expected: nominal, actual });
        }
        Ok(Value::from_wire(element_type, entry.element_size, entry.num_elements, bytes))
    }

    fn read_entry(&mut self) -> Result<DirEntry, DecodeError> {
        let entry = DirEntry::decode(self.source)?;
        self.pos += DIR_ENTRY_SIZE as u64;
        Ok(entry)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.source.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn seek(&mut self, requested: u64) -> Result<(), DecodeError> {
        let landed = self.source.seek(SeekFrom::Start(requested))?;
        self.pos = landed;
        if landed != requested {
            return Err(DecodeError::Seek { requested, landed });
        }
        Ok(())
    }

}

/// Decode a container from an in-memory buffer
pub fn from_bytes<B: ?Sized + AsRef<[u8]>>(buf: &B) -> Result<Container, DecoderError> {
    Decoder::decode(&mut Cursor::new(buf.as_ref()))
}
