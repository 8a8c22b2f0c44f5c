//! Fixed-block posting store.
//!
//! Stores byte keys, each mapped to a growable multiset of `u32` ids, in a
//! single file of 512 byte blocks. See [`store`] for the on-disk structure.

pub mod block;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod store;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::{BlockStore, PostingStore};
