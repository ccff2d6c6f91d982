//! Reading and writing of ABIF files, the key-value container format written by Sanger sequencing instruments.
//!
//! All decoding goes through `Decoder::decode`, which takes any seekable reader, and all encoding goes through
//! `Encoder::encode`, which takes any writer and returns the amount of written bytes. `from_bytes` and `to_bytes` are
//! shortcuts for in-memory buffers.
//!
//! # A note on small values
//!
//! ABIF stores values of up to four bytes within the directory entry that describes them, reusing the four byte
//! field which otherwise holds the offset of the data. The length of such a payload is not preserved by the wire
//! format. `Value` therefore always holds exactly four bytes for these, and a shorter payload passed to `Value::new`
//! is right-aligned and zero-padded. Encoding a decoded container and decoding it again yields an equal container,
//! but not necessarily the original bytes.
//!
//! # A note on ordering
//!
//! `Container` keeps its entries in a `BTreeMap`, so directory entries and out-of-line data are written in key order
//! and encoding the same logical container always produces the same bytes. Files written by instruments typically
//! use other orders; their directories are read in file order. A key that appears twice in a directory is rejected
//! with `DecodeError::DuplicateKey`.
//!
//! # Examples
//!
//! ```
//! use abif::*;
//!
//! let mut container = Container::new(1, 4);
//! container.insert(Key::new("asdf", 4).unwrap(), Value::new(ElementType::Byte, 1, 1, vec![4]).unwrap());
//! let buf = to_bytes(&container).unwrap();
//! assert_eq!(buf.len(), 128 + 28); // header and one directory entry, the data is stored inline
//! assert_eq!(&buf[128..], [
//!     0x61, 0x73, 0x64, 0x66, // 'asdf'
//!     0x00, 0x00, 0x00, 0x04, // number 4
//!     0x00, 0x01,             // element type byte
//!     0x00, 0x01,             // element size 1
//!     0x00, 0x00, 0x00, 0x01, // 1 element
//!     0x00, 0x00, 0x00, 0x01, // data size 1
//!     0x00, 0x00, 0x00, 0x04, // the data itself
//!     0x00, 0x00, 0x00, 0x00, // data handle
//! ]);
//! let decoded = from_bytes(&buf).unwrap();
//! assert_eq!(container, decoded);
//! assert_eq!(decoded.get(b"asdf", 4).unwrap().bytes(), [0, 0, 0, 4]);
//! ```

mod codec;
mod entry;
mod error;
mod value;

pub use codec::*;
pub use entry::{DIR_ENTRY_SIZE, INLINE_LIMIT};
pub use error::*;
pub use value::*;

/// Every ABIF file starts with these bytes
pub const SIGNATURE: &[u8; 4] = b"ABIF";

/// Name of the root directory entry
pub const ROOT_NAME: &[u8; 4] = b"tdir";

/// The only major version this crate reads and writes
pub const SUPPORTED_MAJOR_VERSION: i16 = 1;

/// Signature, version, root entry and padding
pub const HEADER_LENGTH: usize = 128;

/// Reserved bytes at the end of the header
pub const HEADER_PADDING: usize = HEADER_LENGTH - 4 - 2 - DIR_ENTRY_SIZE;
