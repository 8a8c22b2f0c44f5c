use super::{cache::BlockCache, chain, file::BlockFile, index::KeyIndex};

use crate::block::{BlockId, SuperBlock};
use crate::cache::CacheStats;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::format::Raw;

use std::path::{Path, PathBuf};

/// A posting store backed by a single block file.
///
/// Maps byte keys to multisets of `u32` ids, and keeps a separate registry of
/// every id known to the caller. The handle owns the file, the block cache
/// and the key index. It is not thread safe; mutation needs `&mut self`.
pub struct BlockStore {
    cache: BlockCache,
    index: KeyIndex,
}

impl BlockStore {
    /// Open store with default configuration
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_config(StoreConfig::new(path))
    }

    /// Open store with custom configuration
    pub fn open_with_config(config: StoreConfig) -> Result<Self> {
        let file = BlockFile::open(&config)?;
        let mut cache = BlockCache::new(file, config.cache_capacity);

        let fresh = if cache.is_file_empty()? {
            true
        } else {
            let root = cache.root()?;
            if !root.is_uninitialized() {
                root.validate()?;
            }
            root.is_uninitialized()
        };

        if fresh {
            cache.put(BlockId::ROOT, SuperBlock::new())?;
        }

        let head = cache.root()?.index;
        let index = KeyIndex::load_keys(&mut cache, head)?;

        tracing::info!(
            path = %config.path.display(),
            fresh,
            keys = index.len(),
            "Opened block store"
        );

        Ok(Self { cache, index })
    }

    pub fn path(&self) -> &Path {
        self.cache.path()
    }

    /// Flushes all dirty blocks and closes the file.
    pub fn close(mut self) -> Result<()> {
        self.cache.sync()?;
        tracing::info!(keys = self.index.len(), "Closed block store");
        Ok(())
    }

    /// Writes dirty blocks and syncs the file without closing it.
    pub fn sync(&mut self) -> Result<()> {
        self.cache.sync()
    }

    /// Adds `id` to the postings of `key`, creating the key if needed.
    pub fn add_record(&mut self, key: &[u8], id: u32) -> Result<()> {
        let root = self.resolve_or_create(key)?;
        let cache = &mut self.cache;
        let head = chain::add_datum(cache, root, id)?;
        if head != root {
            self.index.update_key_root(cache, key, head)?;
        }
        Ok(())
    }

    /// Adds every id of `ids` to the postings of `key` in one pass.
    pub fn add_records(&mut self, key: &[u8], ids: &[u32]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let root = self.resolve_or_create(key)?;
        let cache = &mut self.cache;
        let head = chain::add_datum_list(cache, root, ids)?;
        if head != root {
            self.index.update_key_root(cache, key, head)?;
        }
        Ok(())
    }

    /// Removes one occurrence of `id` from `key`. Unknown keys and absent
    /// ids are ignored.
    pub fn remove_record(&mut self, key: &[u8], id: u32) -> Result<()> {
        let Some(root) = self.index.key_to_block(key) else {
            return Ok(());
        };
        let cache = &mut self.cache;
        let head = chain::remove_datum(cache, root, id)?;
        if head != root {
            self.index.update_key_root(cache, key, head)?;
        }
        Ok(())
    }

    /// All ids stored under `key`, in no particular order.
    pub fn find_record(&mut self, key: &[u8]) -> Result<Vec<u32>> {
        let Some(root) = self.index.key_to_block(key) else {
            return Ok(Vec::new());
        };
        chain::get_datum(&mut self.cache, root)
    }

    /// Registers `id` as known.
    pub fn add_indexed(&mut self, id: u32) -> Result<()> {
        let cache = &mut self.cache;
        let names = cache.root()?.names;
        let head = chain::add_datum(cache, names, id)?;
        if head != names {
            cache.root_mut()?.names = head;
        }
        Ok(())
    }

    /// Unregisters `id` and purges every occurrence of it from the postings
    /// of every key.
    ///
    /// This visits every key and walks its whole chain, so the cost grows
    /// with the total size of the store.
    pub fn remove_indexed(&mut self, id: u32) -> Result<()> {
        let cache = &mut self.cache;
        let names = cache.root()?.names;
        let (head, _) = chain::purge_datum(cache, names, id)?;
        if head != names {
            cache.root_mut()?.names = head;
        }

        let keys: Vec<Vec<u8>> = self.index.keys().map(|key| key.to_vec()).collect();
        let mut removed = 0;
        for key in &keys {
            let Some(root) = self.index.key_to_block(key) else {
                continue;
            };
            let cache = &mut self.cache;
            let (head, count) = chain::purge_datum(cache, root, id)?;
            if head != root {
                self.index.update_key_root(cache, key, head)?;
            }
            removed += count;
        }
        tracing::debug!(id, keys = keys.len(), removed, "Purged id from all keys");
        Ok(())
    }

    /// Whether `id` is registered.
    pub fn find_indexed(&mut self, id: u32) -> Result<bool> {
        let cache = &mut self.cache;
        let names = cache.root()?.names;
        chain::find_datum(cache, names, id)
    }

    /// Every registered id, in no particular order.
    pub fn indexed(&mut self) -> Result<Vec<u32>> {
        let cache = &mut self.cache;
        let names = cache.root()?.names;
        chain::get_datum(cache, names)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.index.keys()
    }

    /// Number of keys ever added.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Copy of the current superblock.
    pub fn header(&mut self) -> Result<SuperBlock> {
        self.cache.root()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn resolve_or_create(&mut self, key: &[u8]) -> Result<BlockId> {
        if let Some(root) = self.index.key_to_block(key) {
            return Ok(root);
        }
        let cache = &mut self.cache;
        let root = self.index.add_key(cache, key)?;
        tracing::trace!(key = %Raw::new(key), root = root.0, "Added key");
        Ok(root)
    }
}

impl Drop for BlockStore {
    fn drop(&mut self) {
        if let Err(e) = self.cache.flush() {
            tracing::warn!(error = %e, "Failed to flush block store on drop");
        }
    }
}
