//! Block store engine.
//!
//! Keys map to posting chains, chains are linked lists of fixed-size data
//! blocks, and every block access goes through a write-back LRU cache.
//!
//! ```text
//!  block 0                 key blocks                 data blocks
//! ┌────────────┐  index  ┌────────────┐  root   ┌──────┐   ┌──────┐
//! │ SuperBlock ├────────►│ key → root ├────────►│ ids  ├──►│ ids  ├──► 0
//! │ free roof  │         └─────┬──────┘         └──────┘   └──────┘
//! │ index names│               ▼ next
//! └─────┬──────┘         ┌────────────┐
//!       │ names          │ key → root │ ...
//!       ▼                └────────────┘
//!   ┌──────┐
//!   │ ids  ├──► ...   registry of every known id
//!   └──────┘
//! ```
//!
//! # Layers
//! 1. **file**: raw block reads and writes at byte offsets
//! 2. **cache**: decoded blocks, dirty tracking, eviction write-back
//! 3. **alloc**: free list and roof, on top of the cache
//! 4. **chain**: posting chain append, remove and lookup
//! 5. **index**: packed key blocks mirrored by an in-memory hash map
//! 6. **store**: the record API tying keys and chains together
//!
//! Nothing here is crash safe: dirty blocks reach the file on eviction,
//! `sync` or `close`, in no particular order.

mod alloc;
pub mod cache;
pub mod chain;
pub mod file;
pub mod index;
#[allow(clippy::module_inception)]
mod store;

pub use store::BlockStore;

use crate::error::Result;

/// Key to id-set storage as seen by an indexer.
pub trait PostingStore {
    /// Adds `id` to the postings of `key`.
    fn add_record(&mut self, key: &[u8], id: u32) -> Result<()>;

    /// Removes one occurrence of `id` from `key`, ignoring absent pairs.
    fn remove_record(&mut self, key: &[u8], id: u32) -> Result<()>;

    /// Returns the ids stored under `key`, empty for unknown keys.
    fn find_record(&mut self, key: &[u8]) -> Result<Vec<u32>>;

    /// Registers `id` as a known document.
    fn add_indexed(&mut self, id: u32) -> Result<()>;

    /// Unregisters `id` and drops it from every key.
    fn remove_indexed(&mut self, id: u32) -> Result<()>;

    /// Whether `id` is registered.
    fn find_indexed(&mut self, id: u32) -> Result<bool>;

    /// Persists buffered changes.
    fn sync(&mut self) -> Result<()>;
}

impl PostingStore for BlockStore {
    fn add_record(&mut self, key: &[u8], id: u32) -> Result<()> {
        BlockStore::add_record(self, key, id)
    }

    fn remove_record(&mut self, key: &[u8], id: u32) -> Result<()> {
        BlockStore::remove_record(self, key, id)
    }

    fn find_record(&mut self, key: &[u8]) -> Result<Vec<u32>> {
        BlockStore::find_record(self, key)
    }

    fn add_indexed(&mut self, id: u32) -> Result<()> {
        BlockStore::add_indexed(self, id)
    }

    fn remove_indexed(&mut self, id: u32) -> Result<()> {
        BlockStore::remove_indexed(self, id)
    }

    fn find_indexed(&mut self, id: u32) -> Result<bool> {
        BlockStore::find_indexed(self, id)
    }

    fn sync(&mut self) -> Result<()> {
        BlockStore::sync(self)
    }
}
