//! Every entry of an ABIF file is described by a fixed-size directory entry. The first one, the root entry, lives
//! in the file header and describes where the remaining entries are stored. All fields are big-endian.
//!
//! ```text
//! name:         [u8; 4]  [0..4]
//! number:       i32      [4..8]
//! element_type: i16      [8..10]
//! element_size: i16      [10..12]
//! num_elements: i32      [12..16]
//! data_size:    i32      [16..20]
//! data_offset:  u32      [20..24]  absolute offset, or the data itself if data_size <= 4
//! data_handle:  i32      [24..28]  reserved, written as zero
//! ```

use crate::error::{DecodeError, EncodeError};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Size of one directory entry on wire
pub const DIR_ENTRY_SIZE: usize = 28;

/// Largest data size which is stored within the data offset field
pub const INLINE_LIMIT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; 4],
    pub number: i32,
    pub element_type: i16,
    pub element_size: i16,
    pub num_elements: i32,
    pub data_size: i32,
    pub data_offset: u32,
    pub data_handle: i32,
}

impl DirEntry {

    /// Returns the number of written bytes
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<usize, EncodeError> {
        w.write_all(&self.name)?;
        w.write_i32::<BigEndian>(self.number)?;
        w.write_i16::<BigEndian>(self.element_type)?;
        w.write_i16::<BigEndian>(self.element_size)?;
        w.write_i32::<BigEndian>(self.num_elements)?;
        w.write_i32::<BigEndian>(self.data_size)?;
        w.write_u32::<BigEndian>(self.data_offset)?;
        w.write_i32::<BigEndian>(self.data_handle)?;
        Ok(DIR_ENTRY_SIZE)
    }

    /// Reads exactly one entry. A short read surfaces as `DecodeError::Io`.
    pub fn decode<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
        let mut name = [0u8; 4];
        r.read_exact(&mut name)?;
        Ok(DirEntry {
            name,
            number: r.read_i32::<BigEndian>()?,
            element_type: r.read_i16::<BigEndian>()?,
            element_size: r.read_i16::<BigEndian>()?,
            num_elements: r.read_i32::<BigEndian>()?,
            data_size: r.read_i32::<BigEndian>()?,
            data_offset: r.read_u32::<BigEndian>()?,
            data_handle: r.read_i32::<BigEndian>()?,
        })
    }

    /// `element_size * num_elements`, or `None` if either factor is negative
    #[inline]
    pub fn nominal_size(&self) -> Option<usize> {
        nominal_size(self.element_size, self.num_elements)
    }

    /// The data offset field reinterpreted as the inline payload
    #[inline]
    pub fn inline_bytes(&self) -> [u8; 4] {
        self.data_offset.to_be_bytes()
    }

}

#[inline]
pub(crate) fn nominal_size(element_size: i16, num_elements: i32) -> Option<usize> {
    let size = usize::try_from(element_size).ok()?;
    let count = usize::try_from(num_elements).ok()?;
    size.checked_mul(count)
}
