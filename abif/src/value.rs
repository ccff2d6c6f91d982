//! The ABIF data model: a `Container` maps `Key`s to typed `Value`s.
//!
//! A `Value` is an opaque byte payload tagged with an element type, the size of one element and the number of
//! elements. The product of the latter two is the nominal size of the value. Values with a nominal size of at most
//! four bytes are stored on wire within the four byte data offset field of their directory entry, which means their
//! true length is lost. Such values therefore always hold exactly four bytes, with shorter payloads occupying the
//! trailing bytes in big-endian order.

use crate::entry::{nominal_size, INLINE_LIMIT};
use crate::error::EncodeError;
use std::collections::BTreeMap;
use std::fmt;
use std::iter::repeat;

#[cfg(feature = "serde")]
use serde::Serialize;

/// The type of a single element within a `Value`. Codes without a variant of their own, such as user defined types,
/// are preserved as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ElementType {
    Byte,
    Char,
    Word,
    Short,
    Long,
    Float,
    Double,
    Date,
    Time,
    Thumb,
    Bool,
    PString,
    CString,
    /// Marks the root directory entry
    Directory,
    Other(i16),
}

impl ElementType {

    const NAMED: [(ElementType, i16, &'static str); 14] = [
        (ElementType::Byte,      1,    "byte"),
        (ElementType::Char,      2,    "char"),
        (ElementType::Word,      3,    "word"),
        (ElementType::Short,     4,    "short"),
        (ElementType::Long,      5,    "long"),
        (ElementType::Float,     7,    "float"),
        (ElementType::Double,    8,    "double"),
        (ElementType::Date,      10,   "date"),
        (ElementType::Time,      11,   "time"),
        (ElementType::Thumb,     12,   "thumb"),
        (ElementType::Bool,      13,   "bool"),
        (ElementType::PString,   18,   "pString"),
        (ElementType::CString,   19,   "cString"),
        (ElementType::Directory, 1023, "directory"),
    ];

    /// The code of this type on wire
    pub fn code(&self) -> i16 {
        match *self {
            ElementType::Other(code) => code,
            named => Self::NAMED.iter().find(|(t, _, _)| *t == named).map(|(_, c, _)| *c).unwrap_or_default(),
        }
    }

    /// Returns the mnemonic of a named type, `None` for `Other`
    pub fn name(&self) -> Option<&'static str> {
        Self::NAMED.iter().find(|(t, _, _)| t == self).map(|(_, _, n)| *n)
    }

    /// Looks up a type by its mnemonic
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED.iter().find(|(_, _, n)| *n == name).map(|(t, _, _)| *t)
    }

}

impl From<i16> for ElementType {
    fn from(code: i16) -> Self {
        Self::NAMED.iter().find(|(_, c, _)| *c == code).map(|(t, _, _)| *t).unwrap_or(ElementType::Other(code))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None       => write!(f, "#{}", self.code()),
        }
    }
}

/// Identifies one entry. Keys are ordered by name first, then by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Key {
    name: [u8; 4],
    number: i32,
}

impl Key {

    /// Fails with `EncodeError::InvalidKey` unless `name` consists of exactly four ASCII bytes.
    pub fn new<N: AsRef<[u8]>>(name: N, number: i32) -> Result<Self, EncodeError> {
        let name = name.as_ref();
        match <[u8; 4]>::try_from(name) {
            Ok(name) if name.is_ascii() => Ok(Key { name, number }),
            _ => Err(EncodeError::InvalidKey(name.to_vec())),
        }
    }

    /// Takes `name` as is, without the ASCII check of `new`. The decoder builds keys this way, so files carrying
    /// other bytes in their names still round-trip.
    pub fn verbatim(name: [u8; 4], number: i32) -> Self {
        Key { name, number }
    }

    pub fn name(&self) -> &[u8; 4] {
        &self.name
    }

    pub fn number(&self) -> i32 {
        self.number
    }

}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for &b in self.name.iter() {
            match b {
                b'"' | b'\\'             => write!(f, "\\{}", b as char)?,
                0x20..=0x7e              => write!(f, "{}", b as char)?,
                _                        => write!(f, "\\x{:02x}", b)?,
            }
        }
        write!(f, "\" {}", self.number)
    }
}

/// A typed payload. See the module documentation for the normalization of small values.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Value {
    element_type: ElementType,
    element_size: i16,
    num_elements: i32,
    #[cfg_attr(feature = "serde", serde(with = "serde_bytes"))]
    bytes: Vec<u8>,
}

impl Value {

    /// Creates a value, normalizing small payloads to four bytes.
    ///
    /// If the nominal size `element_size * num_elements` exceeds four, `bytes` must have exactly that length.
    /// Otherwise `bytes` must either have the nominal length, in which case it is zero-padded at the front, or
    /// already be four bytes long.
    pub fn new<B: Into<Vec<u8>>>(element_type: ElementType, element_size: i16, num_elements: i32, bytes: B) -> Result<Self, EncodeError> {
        let nominal = nominal_size(element_size, num_elements).ok_or(EncodeError::NegativeSize { element_size, num_elements })?;
        let mut bytes = bytes.into();
        if nominal <= INLINE_LIMIT && bytes.len() != INLINE_LIMIT {
            if bytes.len() != nominal {
                return Err(EncodeError::InvalidValue { nominal, actual: bytes.len() });
            }
            bytes = repeat(0).take(INLINE_LIMIT - nominal).chain(bytes).collect();
        } else if nominal > INLINE_LIMIT && bytes.len() != nominal {
            return Err(EncodeError::InvalidValue { nominal, actual: bytes.len() });
        }
        Ok(Value { element_type, element_size, num_elements, bytes })
    }

    /// Used by the decoder whose payloads already satisfy the invariant
    pub(crate) fn from_wire(element_type: ElementType, element_size: i16, num_elements: i32, bytes: Vec<u8>) -> Self {
        Value { element_type, element_size, num_elements, bytes }
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn element_size(&self) -> i16 {
        self.element_size
    }

    pub fn num_elements(&self) -> i32 {
        self.num_elements
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The nominal size `element_size * num_elements`, which may be smaller than `bytes().len()`
    pub fn data_size(&self) -> usize {
        self.element_size as usize * self.num_elements as usize
    }

    /// Whether this value is stored within its directory entry
    pub fn is_inline(&self) -> bool {
        self.data_size() <= INLINE_LIMIT
    }

}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} x {} = '{}'", self.element_type, self.element_size, self.num_elements, base64::encode(&self.bytes))
    }
}

/// A decoded ABIF file.
///
/// Entries are kept sorted by key so that encoding the same logical container always yields the same bytes.
/// `insert` replaces an existing value for the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Container {
    pub major_version: u16,
    pub minor_version: u16,
    #[cfg_attr(feature = "serde", serde(serialize_with = "entry_list"))]
    pub entries: BTreeMap<Key, Value>,
}

impl Container {

    pub fn new(major_version: u16, minor_version: u16) -> Self {
        Container { major_version, minor_version, entries: BTreeMap::new() }
    }

    /// Inserts an entry and returns the value it replaced, if any
    pub fn insert(&mut self, key: Key, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    /// Looks up an entry by name and number, e.g. `get(b"PBAS", 2)`
    pub fn get(&self, name: &[u8; 4], number: i32) -> Option<&Value> {
        self.entries.get(&Key::verbatim(*name, number))
    }

    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}

impl Default for Container {
    fn default() -> Self {
        Container::new(crate::SUPPORTED_MAJOR_VERSION as u16, 0)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "abif {}.{}", self.major_version, self.minor_version)?;
        for (key, value) in self.entries.iter() {
            write!(f, "\n{}: {}", key, value)?;
        }
        Ok(())
    }
}

// JSON objects need string keys, so entries are written as a list of pairs
#[cfg(feature = "serde")]
fn entry_list<S: serde::Serializer>(entries: &BTreeMap<Key, Value>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(entries.iter())
}

#[cfg(test)]
mod tests {
    use super::{Container, ElementType, Key, Value};
    use crate::error::EncodeError;

    #[test]
    fn element_type_codes() {
        for code in [1, 2, 3, 4, 5, 7, 8, 10, 11, 12, 13, 18, 19, 1023] {
            let t = ElementType::from(code);
            assert!(!matches!(t, ElementType::Other(_)), "code {} should be named", code);
            assert_eq!(code, t.code());
            assert_eq!(Some(t), ElementType::from_name(t.name().unwrap()));
        }
        assert_eq!(ElementType::Other(1024), ElementType::from(1024));
        assert_eq!(ElementType::Other(6), ElementType::from(6));
        assert_eq!(-3, ElementType::from(-3).code());
        assert_eq!("#1024", ElementType::Other(1024).to_string());
        assert_eq!("pString", ElementType::PString.to_string());
    }

    #[test]
    fn key_names() {
        assert!(Key::new("DATA", 1).is_ok());
        assert!(Key::new(b"jkl;", 5).is_ok());
        assert!(matches!(Key::new("DAT", 1), Err(EncodeError::InvalidKey(name)) if name == b"DAT"));
        assert!(matches!(Key::new("DATA1", 1), Err(EncodeError::InvalidKey(_))));
        assert!(matches!(Key::new([b'D', b'A', b'T', 0xc4], 1), Err(EncodeError::InvalidKey(_))));
        assert_eq!([b'D', b'A', b'T', 0xc4], *Key::verbatim([b'D', b'A', b'T', 0xc4], 1).name());
        assert_eq!("\"DAT\\xc4\" 1", Key::verbatim([b'D', b'A', b'T', 0xc4], 1).to_string());
    }

    #[test]
    fn key_order() {
        let mut keys = vec![Key::new("PBAS", 2).unwrap(), Key::new("DATA", 9).unwrap(), Key::new("DATA", 1).unwrap()];
        keys.sort();
        assert_eq!(keys, [Key::new("DATA", 1).unwrap(), Key::new("DATA", 9).unwrap(), Key::new("PBAS", 2).unwrap()]);
    }

    #[test]
    fn small_values_are_normalized() {
        let value = Value::new(ElementType::Byte, 1, 1, vec![4]).unwrap();
        assert_eq!(value.bytes(), [0, 0, 0, 4]);
        assert_eq!(1, value.data_size());
        assert!(value.is_inline());

        let value = Value::new(ElementType::Short, 2, 1, vec![0x12, 0x34]).unwrap();
        assert_eq!(value.bytes(), [0, 0, 0x12, 0x34]);

        let value = Value::new(ElementType::Byte, 1, 1, vec![0, 0, 0, 4]).unwrap();
        assert_eq!(value.bytes(), [0, 0, 0, 4]);

        let value = Value::new(ElementType::Char, 1, 0, Vec::new()).unwrap();
        assert_eq!(value.bytes(), [0, 0, 0, 0]);
    }

    #[test]
    fn payload_length_is_checked() {
        assert!(matches!(Value::new(ElementType::Byte, 1, 1, vec![1, 2, 3]), Err(EncodeError::InvalidValue { nominal: 1, actual: 3 })));
        assert!(matches!(Value::new(ElementType::Byte, 1, 2, vec![1, 2, 3, 4, 5]), Err(EncodeError::InvalidValue { nominal: 2, actual: 5 })));
        assert!(matches!(Value::new(ElementType::Double, 8, 1, vec![1, 2, 3, 4]), Err(EncodeError::InvalidValue { nominal: 8, actual: 4 })));
        assert!(matches!(Value::new(ElementType::Byte, -1, 1, vec![]), Err(EncodeError::NegativeSize { .. })));

        let value = Value::new(ElementType::Char, 1, 5, &b"hello"[..]).unwrap();
        assert_eq!(value.bytes(), b"hello");
        assert!(!value.is_inline());
    }

    #[test]
    fn container_replaces_on_insert() {
        let mut container = Container::new(1, 4);
        let key = Key::new("asdf", 4).unwrap();
        assert!(container.insert(key, Value::new(ElementType::Byte, 1, 1, vec![1]).unwrap()).is_none());
        let old = container.insert(key, Value::new(ElementType::Byte, 1, 1, vec![2]).unwrap());
        assert_eq!(old.unwrap().bytes(), [0, 0, 0, 1]);
        assert_eq!(1, container.len());
        assert_eq!(container.get(b"asdf", 4).unwrap().bytes(), [0, 0, 0, 2]);
        assert!(container.get(b"asdf", 5).is_none());
    }

    #[test]
    fn display() {
        let mut container = Container::new(1, 4);
        container.insert(Key::new("DATA", 1).unwrap(), Value::new(ElementType::Short, 2, 3, vec![0, 1, 0, 2, 0, 3]).unwrap());
        container.insert(Key::new("a\"b\\", 5).unwrap(), Value::new(ElementType::Other(1024), 1, 1, vec![2]).unwrap());
        container.insert(Key::new("PBAS", 1).unwrap(), Value::new(ElementType::Char, 1, 5, &b"ACGTA"[..]).unwrap());
        assert_eq!("abif 1.4\n\"DATA\" 1: short 2 x 3 = 'AAEAAgAD'\n\"PBAS\" 1: char 1 x 5 = 'QUNHVEE='\n\"a\\\"b\\\\\" 5: #1024 1 x 1 = 'AAAAAg=='", container.to_string());
    }

}
