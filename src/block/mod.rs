//! Fixed-size blocks and their three interpretations.
//!
//! A block on disk carries no tag saying what it is. The caller that follows
//! a pointer knows which kind of chain it is walking, and asks the cache for
//! that interpretation through the [`Layout`] trait.

pub mod data;
pub mod header;
pub mod key;

use std::fmt;

pub use data::DataBlock;
pub use header::SuperBlock;
pub use key::KeyBlock;

use crate::error::Result;

/// Size of every block in the backing file.
pub const BLOCK_SIZE: usize = 512;

/// Size of the `next` + `used` prefix shared by data and key blocks.
pub const LINK_SIZE: usize = 12;

/// Byte offset of a block in the backing file.
///
/// Offset 0 holds the superblock, which is never part of a chain, so the same
/// value also serves as the end-of-chain marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockId(pub u64);

impl BlockId {
    pub const NONE: BlockId = BlockId(0);
    pub const ROOT: BlockId = BlockId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self) -> u64 {
        self.0
    }

    pub fn is_aligned(self) -> bool {
        self.0 % BLOCK_SIZE as u64 == 0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Super,
    Data,
    Key,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Super => write!(f, "superblock"),
            Kind::Data => write!(f, "data block"),
            Kind::Key => write!(f, "key block"),
        }
    }
}

/// A decoded block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Super(SuperBlock),
    Data(DataBlock),
    Key(KeyBlock),
}

impl Block {
    pub fn kind(&self) -> Kind {
        match self {
            Block::Super(_) => Kind::Super,
            Block::Data(_) => Kind::Data,
            Block::Key(_) => Kind::Key,
        }
    }

    pub fn decode(kind: Kind, buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Ok(match kind {
            Kind::Super => Block::Super(SuperBlock::decode(buf)?),
            Kind::Data => Block::Data(DataBlock::decode(buf)?),
            Kind::Key => Block::Key(KeyBlock::decode(buf)?),
        })
    }

    pub fn encode(&self) -> Result<[u8; BLOCK_SIZE]> {
        let mut buf = [0u8; BLOCK_SIZE];
        match self {
            Block::Super(block) => block.encode(&mut buf)?,
            Block::Data(block) => block.encode(&mut buf)?,
            Block::Key(block) => block.encode(&mut buf)?,
        }
        Ok(buf)
    }
}

/// Typed view of a [`Block`].
pub trait Layout: Sized + Into<Block> {
    const KIND: Kind;

    /// A freshly reset block of this kind.
    fn empty() -> Self;

    fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self>;

    fn encode(&self, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;

    fn view(block: &Block) -> Option<&Self>;

    fn view_mut(block: &mut Block) -> Option<&mut Self>;
}

macro_rules! impl_layout {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Block {
            fn from(block: $ty) -> Self {
                Block::$variant(block)
            }
        }

        impl Layout for $ty {
            const KIND: Kind = Kind::$variant;

            fn empty() -> Self {
                <$ty>::default()
            }

            fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
                <$ty>::decode(buf)
            }

            fn encode(&self, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
                <$ty>::encode(self, buf)
            }

            fn view(block: &Block) -> Option<&Self> {
                match block {
                    Block::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn view_mut(block: &mut Block) -> Option<&mut Self> {
                match block {
                    Block::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_layout!(SuperBlock, Super);
impl_layout!(DataBlock, Data);
impl_layout!(KeyBlock, Key);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_alignment() {
        assert!(BlockId(0).is_aligned());
        assert!(BlockId(1024).is_aligned());
        assert!(!BlockId(100).is_aligned());
        assert!(BlockId::NONE.is_none());
        assert!(!BlockId(512).is_none());
    }

    #[test]
    fn test_views_reject_other_kinds() {
        let mut block: Block = DataBlock::empty().into();
        assert_eq!(block.kind(), Kind::Data);
        assert!(DataBlock::view(&block).is_some());
        assert!(KeyBlock::view(&block).is_none());
        assert!(SuperBlock::view_mut(&mut block).is_none());
    }

    #[test]
    fn test_link_prefix_is_shared() {
        let mut keys = KeyBlock::empty();
        keys.next = BlockId(2048);
        let buf = Block::Key(keys).encode().expect("Failed to encode");

        let block = Block::decode(Kind::Data, &buf).expect("Failed to decode");
        match block {
            Block::Data(data) => {
                assert_eq!(data.next, BlockId(2048));
                assert!(data.is_empty());
            }
            other => panic!("Expected a data block, got {:?}", other.kind()),
        }
    }
}
