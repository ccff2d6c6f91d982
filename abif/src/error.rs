use crate::value::Key;
use std::fmt::{Display, Formatter, self};

#[derive(Debug)]
pub struct DecoderError {
    inner: DecodeError,
    at: u64,
}

impl DecoderError {
    pub fn into_inner(self) -> DecodeError {
        self.inner
    }

    /// Stream position at which decoding failed
    pub fn position(&self) -> u64 {
        self.at
    }
}

impl std::error::Error for DecoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
       Some(&self.inner)
    }
}

impl Display for DecoderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{} at input position {}", self.inner, self.at)
    }
}

#[derive(Debug)]
pub enum DecodeError {
    BadSignature([u8; 4]),
    UnsupportedVersion(i16, i16),
    Io(std::io::Error),
    Seek { requested: u64, landed: u64 },
    TruncatedData { offset: u64, expected: usize, actual: usize },
    DuplicateKey(Key),
    Length { element_size: i16, num_elements: i32 },
}

impl DecodeError {
    pub fn at(self, at: u64) -> DecoderError {
        DecoderError { inner: self, at }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> DecodeError {
        DecodeError::Io(e)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DecodeError::BadSignature(sig) => write!(f, "Incorrect file signature {:?}, expected \"ABIF\"", String::from_utf8_lossy(sig)),
            DecodeError::UnsupportedVersion(major, minor) => write!(f, "ABIF version {}.{} is not supported, only major version {} is", major, minor, crate::SUPPORTED_MAJOR_VERSION),
            DecodeError::Io(e) => write!(f, "IO error {}", e),
            DecodeError::Seek { requested, landed } => write!(f, "Seek to offset {} landed at offset {}", requested, landed),
            DecodeError::TruncatedData { offset, expected, actual } => write!(f, "Could only read {} of {} data bytes at offset {}", actual, expected, offset),
            DecodeError::DuplicateKey(key) => write!(f, "Key {} occurs more than once in the directory", key),
            DecodeError::Length { element_size, num_elements } => write!(f, "Element size {} times {} elements is not a valid data size", element_size, num_elements),
        }
    }
}

#[derive(Debug)]
pub enum EncodeError {
    Io(std::io::Error),
    InvalidKey(Vec<u8>),
    InvalidValue { nominal: usize, actual: usize },
    NegativeSize { element_size: i16, num_elements: i32 },
    Version { major: u16, minor: u16 },
    Length(usize),
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> EncodeError {
        EncodeError::Io(e)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            EncodeError::Io(e) => write!(f, "IO error {}", e),
            EncodeError::InvalidKey(name) => write!(f, "Key name {:?} is not exactly 4 ASCII bytes", String::from_utf8_lossy(name)),
            EncodeError::InvalidValue { nominal, actual } => write!(f, "Value of nominal size {} can not hold {} bytes", nominal, actual),
            EncodeError::NegativeSize { element_size, num_elements } => write!(f, "Element size {} times {} elements is negative", element_size, num_elements),
            EncodeError::Version { major, minor } => write!(f, "Version {}.{} can not be written, only major version {} is supported", major, minor, crate::SUPPORTED_MAJOR_VERSION),
            EncodeError::Length(value) => write!(f, "Length {} exceeds maximum {}", value, i32::MAX),
        }
    }
}
