use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::block::{Block, BlockId, Kind, Layout, SuperBlock};
use crate::cache::{Cache, CacheStats};
use crate::error::Result;
use crate::Error;

use super::file::BlockFile;

/// A decoded block owned by the cache.
#[derive(Debug)]
struct MemBlock {
    block: Block,
    dirty: bool,
}

/// Write-back LRU cache over a [`BlockFile`].
///
/// All block access goes through here. Reads load missing blocks from disk,
/// writes hand out a [`Dirty`] guard, and dirty blocks only reach the file
/// when they are evicted or on [`BlockCache::sync`].
pub struct BlockCache {
    file: BlockFile,
    blocks: Cache<BlockId, MemBlock>,
}

impl BlockCache {
    pub fn new(file: BlockFile, capacity: usize) -> Self {
        Self {
            file,
            blocks: Cache::new(capacity),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn is_file_empty(&self) -> Result<bool> {
        self.file.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.blocks.stats()
    }

    /// Returns the block `id` interpreted as `T`.
    pub fn read<T: Layout>(&mut self, id: BlockId) -> Result<&T> {
        let mem = self.load(id, T::KIND)?;
        let found = mem.block.kind();
        T::view(&mem.block).ok_or_else(|| mismatch(id, T::KIND, found))
    }

    /// Returns the block `id` for mutation. The entry is marked dirty when
    /// the guard is dropped.
    pub fn write<T: Layout>(&mut self, id: BlockId) -> Result<Dirty<'_, T>> {
        let mem = self.load(id, T::KIND)?;
        let found = mem.block.kind();
        let MemBlock { block, dirty } = mem;
        let value = T::view_mut(block).ok_or_else(|| mismatch(id, T::KIND, found))?;
        Ok(Dirty { value, dirty })
    }

    /// Installs `block` as the content of `id` without reading the disk.
    pub fn put(&mut self, id: BlockId, block: impl Into<Block>) -> Result<()> {
        let mem = MemBlock {
            block: block.into(),
            dirty: true,
        };
        self.make_room(id)?;
        self.blocks.insert(id, mem);
        Ok(())
    }

    /// Current superblock contents.
    pub fn root(&mut self) -> Result<SuperBlock> {
        self.read::<SuperBlock>(BlockId::ROOT).copied()
    }

    pub fn root_mut(&mut self) -> Result<Dirty<'_, SuperBlock>> {
        self.write::<SuperBlock>(BlockId::ROOT)
    }

    /// Writes every dirty block to the file, oldest first. Nothing is evicted.
    pub fn flush(&mut self) -> Result<usize> {
        let dirty: Vec<BlockId> = self
            .blocks
            .iter()
            .filter(|(_, mem)| mem.dirty)
            .map(|(id, _)| *id)
            .collect();

        for id in &dirty {
            if let Some(mem) = self.blocks.peek_mut(id) {
                let buf = mem.block.encode()?;
                self.file.write_block(*id, &buf)?;
                mem.dirty = false;
            }
        }
        Ok(dirty.len())
    }

    /// Flushes dirty blocks and forces them to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        let written = self.flush()?;
        self.file.sync()?;
        tracing::debug!(written, "Synced block cache");
        Ok(())
    }

    fn load(&mut self, id: BlockId, kind: Kind) -> Result<&mut MemBlock> {
        if !self.blocks.contains(&id) {
            self.blocks.record_miss();
            let buf = self.file.read_block(id)?;
            let mem = MemBlock {
                block: Block::decode(kind, &buf)?,
                dirty: false,
            };
            self.make_room(id)?;
            self.blocks.insert(id, mem);
            return self
                .blocks
                .peek_mut(&id)
                .ok_or_else(|| vanished(id));
        }
        self.blocks.get_mut(&id).ok_or_else(|| vanished(id))
    }

    /// Writes back the entry that inserting `id` would evict.
    ///
    /// The victim stays cached until the write succeeds, so a failed write
    /// leaves it dirty and readable instead of dropping the change.
    fn make_room(&mut self, id: BlockId) -> Result<()> {
        if self.blocks.contains(&id) || self.blocks.len() < self.blocks.capacity() {
            return Ok(());
        }
        let Some((&victim, mem)) = self.blocks.peek_lru() else {
            return Ok(());
        };
        if !mem.dirty {
            return Ok(());
        }

        tracing::trace!(block = victim.0, kind = %mem.block.kind(), "Writing back evicted block");
        let buf = mem.block.encode()?;
        self.file.write_block(victim, &buf)?;
        if let Some(mem) = self.blocks.peek_mut(&victim) {
            mem.dirty = false;
        }
        Ok(())
    }
}

fn vanished(id: BlockId) -> Error {
    Error::InvalidOperation(format!("block {} vanished from cache", id))
}

fn mismatch(id: BlockId, expected: Kind, found: Kind) -> Error {
    Error::Corruption(format!(
        "block {} is cached as a {}, not a {}",
        id, found, expected
    ))
}

/// Mutable access to a cached block that marks it dirty on drop.
pub struct Dirty<'a, T> {
    value: &'a mut T,
    dirty: &'a mut bool,
}

impl<T> Deref for Dirty<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<T> DerefMut for Dirty<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value
    }
}

impl<T> Drop for Dirty<'_, T> {
    fn drop(&mut self) {
        *self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::DataBlock;
    use crate::config::StoreConfig;
    use tempfile::tempdir;

    fn open_cache(path: &Path, capacity: usize) -> Result<BlockCache> {
        let file = BlockFile::open(&StoreConfig::new(path))?;
        Ok(BlockCache::new(file, capacity))
    }

    fn data_block(ids: &[u32]) -> DataBlock {
        let mut block = DataBlock::default();
        block.extend(ids);
        block
    }

    #[test]
    fn test_put_then_read_without_disk() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = open_cache(&dir.path().join("store"), 4)?;

        cache.put(BlockId(1024), data_block(&[1, 2, 3]))?;
        assert_eq!(cache.read::<DataBlock>(BlockId(1024))?.ids(), &[1, 2, 3]);
        assert!(cache.is_file_empty()?);
        Ok(())
    }

    #[test]
    fn test_guard_marks_dirty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("store");
        let mut cache = open_cache(&path, 4)?;

        cache.put(BlockId(512), data_block(&[7]))?;
        cache.sync()?;

        {
            let mut block = cache.write::<DataBlock>(BlockId(512))?;
            block.push(8);
        }
        assert_eq!(cache.flush()?, 1);
        assert_eq!(cache.flush()?, 0);
        drop(cache);

        let mut cache = open_cache(&path, 4)?;
        assert_eq!(cache.read::<DataBlock>(BlockId(512))?.ids(), &[7, 8]);
        Ok(())
    }

    #[test]
    fn test_eviction_writes_back() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = open_cache(&dir.path().join("store"), 2)?;

        for i in 1..=8u64 {
            cache.put(BlockId(i * 512), data_block(&[i as u32; 3]))?;
        }
        assert_eq!(cache.stats().len, 2);

        // the first blocks were evicted and must come back from disk
        for i in 1..=8u64 {
            let block = cache.read::<DataBlock>(BlockId(i * 512))?;
            assert_eq!(block.ids(), &[i as u32; 3]);
        }
        Ok(())
    }

    #[test]
    fn test_miss_then_hit() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("store");
        let mut cache = open_cache(&path, 4)?;
        cache.put(BlockId(512), data_block(&[1]))?;
        cache.sync()?;
        drop(cache);

        let mut cache = open_cache(&path, 4)?;
        cache.read::<DataBlock>(BlockId(512))?;
        cache.read::<DataBlock>(BlockId(512))?;
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        Ok(())
    }

    #[test]
    fn test_failed_write_back_keeps_block() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = open_cache(&dir.path().join("store"), 1)?;

        // a misaligned id cannot be written, so evicting it fails
        let bad = BlockId(100);
        cache.put(bad, data_block(&[4, 5]))?;
        assert!(matches!(
            cache.put(BlockId(512), data_block(&[6])),
            Err(Error::Corruption(_))
        ));

        assert_eq!(cache.stats().len, 1);
        assert_eq!(cache.read::<DataBlock>(bad)?.ids(), &[4, 5]);
        assert!(cache.flush().is_err());
        Ok(())
    }

    #[test]
    fn test_kind_mismatch() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = open_cache(&dir.path().join("store"), 4)?;

        cache.put(BlockId::ROOT, SuperBlock::new())?;
        assert!(matches!(
            cache.read::<DataBlock>(BlockId::ROOT),
            Err(Error::Corruption(_))
        ));
        assert_eq!(cache.root()?.roof, 1024);
        Ok(())
    }

    #[test]
    fn test_missing_block_is_short_read() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = open_cache(&dir.path().join("store"), 4)?;
        assert!(matches!(
            cache.read::<DataBlock>(BlockId(2048)),
            Err(Error::ShortRead(_))
        ));
        Ok(())
    }
}
