use crate::error::Result;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use super::{BlockId, BLOCK_SIZE, LINK_SIZE};

/// `root u64 | offset u16`
pub const ENTRY_SIZE: usize = 10;

/// Longest key that fits into an otherwise empty key block.
pub const MAX_KEY_LEN: usize = BLOCK_SIZE - LINK_SIZE - ENTRY_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// head of the key's posting chain
    pub root: BlockId,
    pub key: Vec<u8>,
}

/// One link of the key index chain.
///
/// Entries grow from the front of the block, key bytes are packed from the
/// end backwards. Key `i` spans `[offset_i, end_i)` where `end_0` is the
/// block size and `end_i` is the offset of entry `i - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyBlock {
    pub next: BlockId,
    entries: Vec<KeyEntry>,
    /// total key bytes packed at the tail
    packed: usize,
}

impl KeyBlock {
    pub fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn free_space(&self) -> usize {
        BLOCK_SIZE - LINK_SIZE - self.entries.len() * ENTRY_SIZE - self.packed
    }

    pub fn fits(&self, key_len: usize) -> bool {
        ENTRY_SIZE + key_len <= self.free_space()
    }

    /// Appends a key entry and returns its slot.
    pub fn insert(&mut self, key: &[u8], root: BlockId) -> Result<usize> {
        if key.len() > MAX_KEY_LEN {
            return Err(Error::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        if !self.fits(key.len()) {
            return Err(Error::InvalidOperation(format!(
                "key of {} bytes does not fit, {} bytes free",
                key.len(),
                self.free_space()
            )));
        }
        self.entries.push(KeyEntry {
            root,
            key: key.to_vec(),
        });
        self.packed += key.len();
        Ok(self.entries.len() - 1)
    }

    pub fn set_root(&mut self, slot: usize, root: BlockId) -> Result<()> {
        let used = self.entries.len();
        let entry = self.entries.get_mut(slot).ok_or_else(|| {
            Error::Corruption(format!("key slot {} out of range ({} used)", slot, used))
        })?;
        entry.root = root;
        Ok(())
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < BLOCK_SIZE {
            return Err(Error::Corruption(format!(
                "key block buffer is {} bytes",
                buf.len()
            )));
        }

        let mut cursor = Cursor::new(buf);
        let next = cursor
            .read_u64::<BigEndian>()
            .map_err(|e| Error::Decode("next", e))?;
        let used = cursor
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("used", e))? as usize;

        let entries_end = LINK_SIZE + used * ENTRY_SIZE;
        if entries_end > BLOCK_SIZE {
            return Err(Error::Corruption(format!(
                "key block claims {} entries",
                used
            )));
        }

        let mut entries = Vec::with_capacity(used);
        let mut end = BLOCK_SIZE;
        for _ in 0..used {
            let root = cursor
                .read_u64::<BigEndian>()
                .map_err(|e| Error::Decode("root", e))?;
            let offset = cursor
                .read_u16::<BigEndian>()
                .map_err(|e| Error::Decode("offset", e))? as usize;

            if offset < entries_end || offset > end {
                return Err(Error::Corruption(format!(
                    "key offset {} outside [{}, {}]",
                    offset, entries_end, end
                )));
            }

            entries.push(KeyEntry {
                root: BlockId(root),
                key: buf[offset..end].to_vec(),
            });
            end = offset;
        }

        Ok(KeyBlock {
            next: BlockId(next),
            entries,
            packed: BLOCK_SIZE - end,
        })
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < BLOCK_SIZE {
            return Err(Error::Encode(
                "key block",
                std::io::Error::new(std::io::ErrorKind::WriteZero, "buffer too small"),
            ));
        }

        let mut end = BLOCK_SIZE;
        let mut offsets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let offset = end - entry.key.len();
            buf[offset..end].copy_from_slice(&entry.key);
            offsets.push(offset as u16);
            end = offset;
        }

        let mut cursor = Cursor::new(&mut buf[..end]);
        cursor
            .write_u64::<BigEndian>(self.next.0)
            .map_err(|e| Error::Encode("next", e))?;
        cursor
            .write_u32::<BigEndian>(self.entries.len() as u32)
            .map_err(|e| Error::Encode("used", e))?;
        for (entry, offset) in self.entries.iter().zip(offsets) {
            cursor
                .write_u64::<BigEndian>(entry.root.0)
                .map_err(|e| Error::Encode("root", e))?;
            cursor
                .write_u16::<BigEndian>(offset)
                .map_err(|e| Error::Encode("offset", e))?;
        }
        Ok(())
    }
}
