use std::io;

use crate::block::BlockId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    InvalidHeader,
    Decode(&'static str, io::Error),
    Encode(&'static str, io::Error),
    ShortRead(BlockId),
    Corruption(String),
    KeyTooLong { len: usize, max: usize },
    InvalidOperation(String),
    ReadError(&'static str, io::Error),
    WriteError(&'static str, io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IoError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::InvalidHeader => write!(f, "Invalid superblock header"),
            Error::Decode(field, err) => write!(f, "Failed to decode {}: {}", field, err),
            Error::Encode(field, err) => write!(f, "Failed to encode {}: {}", field, err),
            Error::ShortRead(id) => write!(f, "Short read of block {}", id),
            Error::Corruption(msg) => write!(f, "Store corruption: {}", msg),
            Error::KeyTooLong { len, max } => {
                write!(f, "Key of {} bytes exceeds the {} byte limit", len, max)
            }
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::ReadError(context, err) => write!(f, "Failed to read {}: {}", context, err),
            Error::WriteError(context, err) => write!(f, "Failed to write {}: {}", context, err),
        }
    }
}

impl std::error::Error for Error {}
