//! Block persistence adapter (ambient, §4.11/§6).
//!
//! `spec.md` §6 specifies a concrete on-disk layout: one file per accepted
//! block, named by its hex hash, under a configured folder, rebuilt by
//! directory scan on startup. A key-value store's indexing doesn't match or
//! add anything to that contract, so `rocksdb` is dropped in favor of a
//! plain `std::fs`-based adapter (`file::FileBlockPersistence`); the trait
//! and test-double shape are grounded on the teacher's
//! `storage/{mem,rocksdb}.rs`.

pub mod file;
pub mod mem;

pub use file::FileBlockPersistence;
pub use mem::InMemoryBlockPersistence;

use crate::types::{Block, BlockHash};

/// Persists accepted blocks to disk and reloads them on startup.
pub trait BlockPersistence: Send + Sync {
    /// Writes `block`, keyed by its own hash. Errors are logged by the
    /// caller and do not stop the node (`spec.md` §7: "Log, block remains
    /// in memory; retry on next checkpoint").
    fn store_block(&self, block: &Block) -> std::io::Result<()>;

    /// Loads every persisted block, in no particular order; the caller
    /// (the node controller) re-inserts them into the tree, which sorts out
    /// parent/child order via the usual dangling-queue retry path.
    fn load_all(&self) -> std::io::Result<Vec<Block>>;

    /// Fetches a single block by hash, if persisted.
    fn load_block(&self, hash: &BlockHash) -> std::io::Result<Option<Block>>;
}
