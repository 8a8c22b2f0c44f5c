use crate::error::Result;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use super::{BlockId, BLOCK_SIZE};

/// Version tag written at the start of every store file.
pub const VERSION: [u8; 4] = *b"PDB1";

// 4 + 4 * 8 bytes
pub const HEADER_SIZE: usize = 36;

/// Roof of a freshly initialized store: the superblock plus one reserved block.
pub const INITIAL_ROOF: u64 = 2 * BLOCK_SIZE as u64;

/// Allocator state and chain roots, stored in block 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuperBlock {
    pub version: [u8; 4],
    /// head of the free list
    pub free: BlockId,
    /// first byte offset never handed out
    pub roof: u64,
    /// head of the key block chain
    pub index: BlockId,
    /// head of the global id chain
    pub names: BlockId,
}

impl SuperBlock {
    pub fn new() -> Self {
        SuperBlock {
            version: VERSION,
            free: BlockId::NONE,
            roof: INITIAL_ROOF,
            index: BlockId::NONE,
            names: BlockId::NONE,
        }
    }

    /// A superblock that was never written reads back as all zeroes.
    pub fn is_uninitialized(&self) -> bool {
        self.roof == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != VERSION {
            return Err(Error::InvalidHeader);
        }
        if self.roof < INITIAL_ROOF || self.roof % BLOCK_SIZE as u64 != 0 {
            return Err(Error::Corruption(format!(
                "superblock roof {} is not a valid block boundary",
                self.roof
            )));
        }
        Ok(())
    }

    /// Number of blocks between offset 0 and the roof.
    pub fn block_count(&self) -> u64 {
        self.roof / BLOCK_SIZE as u64
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::InvalidHeader);
        }
        SuperBlockDecoder::new(Cursor::new(buf)).decode()
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        SuperBlockEncoder::new(Cursor::new(buf)).encode(self)
    }
}

pub struct SuperBlockDecoder<R: Read> {
    reader: R,
}

impl<R: Read> SuperBlockDecoder<R> {
    pub fn new(reader: R) -> Self {
        SuperBlockDecoder { reader }
    }

    pub fn decode(&mut self) -> Result<SuperBlock> {
        let mut version = [0u8; 4];
        self.reader
            .read_exact(&mut version)
            .map_err(|e| Error::Decode("version", e))?;

        let free = self.read_u64("free")?;
        let roof = self.read_u64("roof")?;
        let index = self.read_u64("index")?;
        let names = self.read_u64("names")?;

        Ok(SuperBlock {
            version,
            free: BlockId(free),
            roof,
            index: BlockId(index),
            names: BlockId(names),
        })
    }

    fn read_u64(&mut self, field: &'static str) -> Result<u64> {
        self.reader
            .read_u64::<BigEndian>()
            .map_err(|e| Error::Decode(field, e))
    }
}

pub struct SuperBlockEncoder<W: Write> {
    writer: W,
}

impl<W: Write> SuperBlockEncoder<W> {
    pub fn new(writer: W) -> Self {
        SuperBlockEncoder { writer }
    }

    pub fn encode(&mut self, header: &SuperBlock) -> Result<()> {
        self.writer
            .write_all(&header.version)
            .map_err(|e| Error::Encode("version", e))?;

        self.write_u64("free", header.free.0)?;
        self.write_u64("roof", header.roof)?;
        self.write_u64("index", header.index.0)?;
        self.write_u64("names", header.names.0)?;

        Ok(())
    }

    fn write_u64(&mut self, field: &'static str, value: u64) -> Result<()> {
        self.writer
            .write_u64::<BigEndian>(value)
            .map_err(|e| Error::Encode(field, e))
    }
}
