use std::collections::HashMap;

use crate::block::key::MAX_KEY_LEN;
use crate::block::{BlockId, DataBlock, KeyBlock};
use crate::error::Result;
use crate::format::Raw;
use crate::Error;

use super::cache::BlockCache;

/// Where a key lives on disk and which chain it currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemIdx {
    pub root: BlockId,
    /// key block holding the entry
    pub block: BlockId,
    pub slot: usize,
}

/// In-memory mirror of the on-disk key blocks.
#[derive(Debug, Default)]
pub struct KeyIndex {
    keys: HashMap<Vec<u8>, MemIdx>,
}

impl KeyIndex {
    /// Rebuilds the index by walking the key block chain starting at `head`.
    pub fn load_keys(cache: &mut BlockCache, head: BlockId) -> Result<Self> {
        let mut index = KeyIndex::default();
        let mut remaining = cache.root()?.block_count();
        let mut id = head;
        let mut blocks = 0usize;

        while !id.is_none() {
            if remaining == 0 {
                return Err(Error::Corruption(format!(
                    "key block chain through {} does not terminate",
                    id
                )));
            }
            remaining -= 1;

            let block = cache.read::<KeyBlock>(id)?;
            for (slot, entry) in block.entries().iter().enumerate() {
                let idx = MemIdx {
                    root: entry.root,
                    block: id,
                    slot,
                };
                if index.keys.insert(entry.key.clone(), idx).is_some() {
                    return Err(Error::Corruption(format!(
                        "key {} stored twice",
                        Raw::bytes(&entry.key)
                    )));
                }
            }
            blocks += 1;
            id = block.next;
        }

        tracing::debug!(keys = index.keys.len(), blocks, "Loaded key index");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.keys.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Option<&MemIdx> {
        self.keys.get(key)
    }

    /// Current chain root of `key`, `None` if the key was never added.
    pub fn key_to_block(&self, key: &[u8]) -> Option<BlockId> {
        self.keys.get(key).map(|idx| idx.root)
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.keys.keys().map(|key| key.as_slice())
    }

    /// Stores a new key with a fresh empty chain and returns that chain's root.
    pub fn add_key(&mut self, cache: &mut BlockCache, key: &[u8]) -> Result<BlockId> {
        if key.len() > MAX_KEY_LEN {
            return Err(Error::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        if self.keys.contains_key(key) {
            return Err(Error::InvalidOperation(format!(
                "key {} already indexed",
                Raw::bytes(key)
            )));
        }

        let head = cache.root()?.index;
        let target = if !head.is_none() && cache.read::<KeyBlock>(head)?.fits(key.len()) {
            head
        } else {
            let id = cache.get_block::<KeyBlock>()?;
            cache.write::<KeyBlock>(id)?.next = head;
            cache.root_mut()?.index = id;
            tracing::debug!(block = id.0, previous = head.0, "Started new key block");
            id
        };

        let root = cache.get_block::<DataBlock>()?;
        let slot = cache.write::<KeyBlock>(target)?.insert(key, root)?;
        self.add_key_mem(key, MemIdx {
            root,
            block: target,
            slot,
        });
        Ok(root)
    }

    fn add_key_mem(&mut self, key: &[u8], idx: MemIdx) {
        self.keys.insert(key.to_vec(), idx);
    }

    /// Points `key` at a new chain head, both on disk and in memory.
    pub fn update_key_root(
        &mut self,
        cache: &mut BlockCache,
        key: &[u8],
        root: BlockId,
    ) -> Result<()> {
        let idx = self.keys.get_mut(key).ok_or_else(|| {
            Error::InvalidOperation(format!("key {} is not indexed", Raw::bytes(key)))
        })?;
        cache.write::<KeyBlock>(idx.block)?.set_root(idx.slot, root)?;
        idx.root = root;
        Ok(())
    }
}
