//! Posting chains: unordered multisets of ids stored as singly linked lists
//! of data blocks.
//!
//! A chain is identified by its head block. Growth and shrinkage happen at
//! the head, so every mutating call returns the head the caller must store
//! from now on. `BlockId::NONE` is the empty chain.

use crate::block::{BlockId, DataBlock};
use crate::error::Result;
use crate::Error;

use super::cache::BlockCache;

/// Appends `value`, allocating a new head block when the current one is full.
pub fn add_datum(cache: &mut BlockCache, head: BlockId, value: u32) -> Result<BlockId> {
    if !head.is_none() && !cache.read::<DataBlock>(head)?.is_full() {
        cache.write::<DataBlock>(head)?.push(value);
        return Ok(head);
    }

    let id = cache.get_block::<DataBlock>()?;
    let mut block = cache.write::<DataBlock>(id)?;
    block.next = head;
    block.push(value);
    Ok(id)
}

/// Appends all of `values`: first into the spare room of the head block,
/// then into as many freshly allocated full heads as needed.
pub fn add_datum_list(cache: &mut BlockCache, head: BlockId, values: &[u32]) -> Result<BlockId> {
    let mut head = head;
    let mut rest = values;

    if !head.is_none() && !rest.is_empty() && !cache.read::<DataBlock>(head)?.is_full() {
        let taken = cache.write::<DataBlock>(head)?.extend(rest);
        rest = &rest[taken..];
    }

    while !rest.is_empty() {
        let id = cache.get_block::<DataBlock>()?;
        let mut block = cache.write::<DataBlock>(id)?;
        block.next = head;
        let taken = block.extend(rest);
        rest = &rest[taken..];
        head = id;
    }
    Ok(head)
}

/// Removes one occurrence of `value`.
///
/// The hole is filled with the last id of the head block, wherever in the
/// chain the match was. A head block left empty is freed and its successor
/// becomes the head.
pub fn remove_datum(cache: &mut BlockCache, head: BlockId, value: u32) -> Result<BlockId> {
    match locate(cache, head, value)? {
        Some((found, slot)) => remove_at(cache, head, found, slot),
        None => Ok(head),
    }
}

/// Removes every occurrence of `value`. Returns the new head and the number
/// of ids removed.
pub fn purge_datum(cache: &mut BlockCache, head: BlockId, value: u32) -> Result<(BlockId, usize)> {
    let mut head = head;
    let mut removed = 0;
    while let Some((found, slot)) = locate(cache, head, value)? {
        head = remove_at(cache, head, found, slot)?;
        removed += 1;
    }
    Ok((head, removed))
}

fn remove_at(cache: &mut BlockCache, head: BlockId, found: BlockId, slot: usize) -> Result<BlockId> {
    let (emptied, next) = if found == head {
        let mut block = cache.write::<DataBlock>(head)?;
        block.swap_remove(slot);
        (block.is_empty(), block.next)
    } else {
        let (filler, emptied, next) = {
            let mut block = cache.write::<DataBlock>(head)?;
            let filler = block.pop().ok_or_else(|| {
                Error::Corruption(format!("empty head block {} in a non-empty chain", head))
            })?;
            (filler, block.is_empty(), block.next)
        };
        cache.write::<DataBlock>(found)?.set(slot, filler)?;
        (emptied, next)
    };

    if emptied {
        cache.free_block(head)?;
        return Ok(next);
    }
    Ok(head)
}

/// Whether `value` occurs anywhere in the chain.
pub fn find_datum(cache: &mut BlockCache, head: BlockId, value: u32) -> Result<bool> {
    Ok(locate(cache, head, value)?.is_some())
}

/// Collects every id in the chain, head block first.
pub fn get_datum(cache: &mut BlockCache, head: BlockId) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    let mut walk = Walk::new(cache, head)?;
    while let Some(id) = walk.next_block() {
        let block = cache.read::<DataBlock>(id)?;
        ids.extend_from_slice(block.ids());
        walk.advance(block.next)?;
    }
    Ok(ids)
}

fn locate(cache: &mut BlockCache, head: BlockId, value: u32) -> Result<Option<(BlockId, usize)>> {
    let mut walk = Walk::new(cache, head)?;
    while let Some(id) = walk.next_block() {
        let block = cache.read::<DataBlock>(id)?;
        if let Some(slot) = block.position(value) {
            return Ok(Some((id, slot)));
        }
        walk.advance(block.next)?;
    }
    Ok(None)
}

/// Chain cursor bounded by the number of allocated blocks, so a corrupted
/// cyclic chain ends in an error instead of an endless loop.
struct Walk {
    current: BlockId,
    remaining: u64,
}

impl Walk {
    fn new(cache: &mut BlockCache, head: BlockId) -> Result<Self> {
        let remaining = if head.is_none() {
            0
        } else {
            cache.root()?.block_count()
        };
        Ok(Walk {
            current: head,
            remaining,
        })
    }

    fn next_block(&self) -> Option<BlockId> {
        if self.current.is_none() {
            None
        } else {
            Some(self.current)
        }
    }

    fn advance(&mut self, next: BlockId) -> Result<()> {
        if self.remaining == 0 {
            return Err(Error::Corruption(format!(
                "chain through block {} does not terminate",
                self.current
            )));
        }
        self.remaining -= 1;
        self.current = next;
        Ok(())
    }
}
