use crate::error::Result;
use crate::Error;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use super::{BlockId, BLOCK_SIZE, LINK_SIZE};

/// Width of one stored id.
pub const ID_SIZE: usize = 4;

/// Number of ids a single data block holds.
pub const DATA_CAPACITY: usize = (BLOCK_SIZE - LINK_SIZE) / ID_SIZE;

/// One link of a posting chain.
///
/// Layout: `next u64 | used u32 | used * id u32`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataBlock {
    pub next: BlockId,
    ids: Vec<u32>,
}

impl DataBlock {
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= DATA_CAPACITY
    }

    pub fn room(&self) -> usize {
        DATA_CAPACITY - self.ids.len()
    }

    pub fn position(&self, id: u32) -> Option<usize> {
        self.ids.iter().position(|v| *v == id)
    }

    /// Appends `id` if there is room left.
    pub fn push(&mut self, id: u32) -> bool {
        if self.is_full() {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Appends as many of `ids` as fit and returns how many were taken.
    pub fn extend(&mut self, ids: &[u32]) -> usize {
        let take = ids.len().min(self.room());
        self.ids.extend_from_slice(&ids[..take]);
        take
    }

    /// Removes the last id, the one used to fill holes left by removals.
    pub fn pop(&mut self) -> Option<u32> {
        self.ids.pop()
    }

    pub fn set(&mut self, slot: usize, id: u32) -> Result<()> {
        let used = self.ids.len();
        let target = self.ids.get_mut(slot).ok_or_else(|| {
            Error::InvalidOperation(format!("slot {} out of range ({} used)", slot, used))
        })?;
        *target = id;
        Ok(())
    }

    /// Removes the id at `slot`, moving the last id into its place.
    pub fn swap_remove(&mut self, slot: usize) -> Option<u32> {
        if slot < self.ids.len() {
            Some(self.ids.swap_remove(slot))
        } else {
            None
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buf);
        let next = cursor
            .read_u64::<BigEndian>()
            .map_err(|e| Error::Decode("next", e))?;
        let used = cursor
            .read_u32::<BigEndian>()
            .map_err(|e| Error::Decode("used", e))? as usize;

        if used > DATA_CAPACITY {
            return Err(Error::Corruption(format!(
                "data block claims {} ids, capacity is {}",
                used, DATA_CAPACITY
            )));
        }

        let mut ids = Vec::with_capacity(used);
        for _ in 0..used {
            let id = cursor
                .read_u32::<BigEndian>()
                .map_err(|e| Error::Decode("id", e))?;
            ids.push(id);
        }

        Ok(DataBlock {
            next: BlockId(next),
            ids,
        })
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        let mut cursor = Cursor::new(buf);
        cursor
            .write_u64::<BigEndian>(self.next.0)
            .map_err(|e| Error::Encode("next", e))?;
        cursor
            .write_u32::<BigEndian>(self.ids.len() as u32)
            .map_err(|e| Error::Encode("used", e))?;
        for id in &self.ids {
            cursor
                .write_u32::<BigEndian>(*id)
                .map_err(|e| Error::Encode("id", e))?;
        }
        Ok(())
    }
}
