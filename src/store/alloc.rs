use crate::block::{BlockId, DataBlock, Layout, BLOCK_SIZE};
use crate::error::Result;
use crate::Error;

use super::cache::BlockCache;

impl BlockCache {
    /// Hands out a block reset to an empty `T`.
    ///
    /// Reuses the head of the free list when there is one, otherwise grows
    /// the file at the roof. Both the new block and the superblock end up
    /// dirty.
    pub fn get_block<T: Layout>(&mut self) -> Result<BlockId> {
        let root = self.root()?;

        let id = if !root.free.is_none() {
            let next = self.read::<DataBlock>(root.free)?.next;
            self.root_mut()?.free = next;
            tracing::trace!(block = root.free.0, "Reusing free block");
            root.free
        } else {
            let id = BlockId(root.roof);
            let roof = root
                .roof
                .checked_add(BLOCK_SIZE as u64)
                .ok_or_else(|| Error::InvalidOperation("block address space exhausted".into()))?;
            self.root_mut()?.roof = roof;
            id
        };

        if id.is_none() {
            return Err(Error::Corruption("allocator returned the superblock".into()));
        }

        self.put(id, T::empty())?;
        Ok(id)
    }

    /// Pushes `id` onto the front of the free list.
    pub fn free_block(&mut self, id: BlockId) -> Result<()> {
        if id.is_none() {
            return Err(Error::InvalidOperation("cannot free the superblock".into()));
        }

        let free = self.root()?.free;
        let mut node = DataBlock::empty();
        node.next = free;
        self.put(id, node)?;
        self.root_mut()?.free = id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{KeyBlock, SuperBlock};
    use crate::config::StoreConfig;
    use crate::store::file::BlockFile;
    use tempfile::tempdir;

    fn fresh_cache(dir: &std::path::Path, capacity: usize) -> Result<BlockCache> {
        let file = BlockFile::open(&StoreConfig::new(dir.join("store")))?;
        let mut cache = BlockCache::new(file, capacity);
        cache.put(BlockId::ROOT, SuperBlock::new())?;
        Ok(cache)
    }

    #[test]
    fn test_allocation_grows_roof() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = fresh_cache(dir.path(), 16)?;

        assert_eq!(cache.get_block::<DataBlock>()?, BlockId(1024));
        assert_eq!(cache.get_block::<KeyBlock>()?, BlockId(1536));
        assert_eq!(cache.root()?.roof, 2048);
        assert!(cache.read::<KeyBlock>(BlockId(1536))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_free_list_is_lifo() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = fresh_cache(dir.path(), 16)?;

        let a = cache.get_block::<DataBlock>()?;
        let b = cache.get_block::<DataBlock>()?;
        let c = cache.get_block::<DataBlock>()?;

        cache.free_block(a)?;
        cache.free_block(c)?;
        assert_eq!(cache.root()?.free, c);
        assert_eq!(cache.read::<DataBlock>(c)?.next, a);

        assert_eq!(cache.get_block::<DataBlock>()?, c);
        assert_eq!(cache.get_block::<DataBlock>()?, a);
        assert!(cache.root()?.free.is_none());

        // roof untouched while the free list had blocks
        assert_eq!(cache.get_block::<DataBlock>()?, BlockId(b.0 + 2 * 512));
        Ok(())
    }

    #[test]
    fn test_reused_block_is_reset() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = fresh_cache(dir.path(), 16)?;

        let id = cache.get_block::<DataBlock>()?;
        cache.write::<DataBlock>(id)?.extend(&[1, 2, 3]);
        cache.free_block(id)?;

        let again = cache.get_block::<DataBlock>()?;
        assert_eq!(again, id);
        let block = cache.read::<DataBlock>(again)?;
        assert!(block.is_empty());
        assert!(block.next.is_none());
        Ok(())
    }

    #[test]
    fn test_free_list_survives_eviction() -> Result<()> {
        let dir = tempdir()?;
        // room for the superblock and one more block
        let mut cache = fresh_cache(dir.path(), 2)?;

        let ids: Vec<_> = (0..6)
            .map(|_| cache.get_block::<DataBlock>())
            .collect::<Result<Vec<_>>>()?;
        for id in &ids {
            cache.free_block(*id)?;
        }

        let mut reused = Vec::new();
        for _ in 0..6 {
            reused.push(cache.get_block::<DataBlock>()?);
        }
        reused.reverse();
        assert_eq!(reused, ids);
        Ok(())
    }

    #[test]
    fn test_cannot_free_superblock() -> Result<()> {
        let dir = tempdir()?;
        let mut cache = fresh_cache(dir.path(), 4)?;
        assert!(cache.free_block(BlockId::ROOT).is_err());
        Ok(())
    }
}
