//! Facade owning the three page families (data, index, overflow) that make
//! up one on-disk database.
//!
//! Grounded in the original `storage/storage.h`/`storage/storage.cpp`: one
//! object owning a `BlockStorage<T>` per page family plus the page-size
//! probe. The original's scratch byte buffer and its `sysconf`/`GetSystemInfo`
//! call have no idiomatic Rust/ecosystem equivalent in this crate's
//! dependency stack, so page-size detection falls back to the documented
//! default directly (see `system_page_size`).

use crate::block_store::BlockStore;
use crate::error::Result;
use crate::node::Node;
use crate::overflow::OverflowBlock;
use crate::record::{DataBlock, Record};
use log::debug;

const DEFAULT_PAGE_SIZE: usize = 4096;

pub struct Storage {
    pub data: BlockStore<DataBlock>,
    pub index: BlockStore<Node>,
    pub overflow: BlockStore<OverflowBlock>,
    page_size: usize,
}

impl Storage {
    /// Opens (or creates) a database rooted at `dir`. `data_count`,
    /// `index_count`, and `overflow_count` are the number of blocks already
    /// on disk for each family (0 for a fresh database), used to seed each
    /// `BlockStore`'s next-id counter.
    pub fn new(dir: impl AsRef<std::path::Path>, data_count: i32, index_count: i32, overflow_count: i32) -> Self {
        let dir = dir.as_ref();
        Storage {
            data: BlockStore::new(format!("{}/data_", dir.display()), data_count),
            index: BlockStore::new(format!("{}/index_", dir.display()), index_count),
            overflow: BlockStore::new(format!("{}/overflow_", dir.display()), overflow_count),
            page_size: Self::system_page_size(),
        }
    }

    /// The original probes `sysconf(_SC_PAGESIZE)`/`GetSystemInfo`, falling
    /// back to 4096 on failure. No crate in this dependency stack wraps that
    /// syscall and std exposes no portable accessor for it, so this crate
    /// takes the fallback branch unconditionally.
    pub fn system_page_size() -> usize {
        debug!("storage: using static page size fallback of {DEFAULT_PAGE_SIZE} bytes");
        DEFAULT_PAGE_SIZE
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn get_data_block(&mut self, id: i32) -> Result<&DataBlock> {
        self.data.get(id)
    }

    pub fn get_index_block(&mut self, id: i32) -> Result<&Node> {
        self.index.get(id)
    }

    pub fn get_overflow_block(&mut self, id: i32) -> Result<&OverflowBlock> {
        self.overflow.get(id)
    }

    pub fn track_new_index_block(&mut self, node: Node) -> i32 {
        self.index.track_new(node)
    }

    /// Packs `records` into `DataBlock`s of `max_records_per_block(page_size)`
    /// capacity each, tracks every block (including a trailing partial one),
    /// writes the whole data family to disk, and returns the total block
    /// count.
    pub fn write_data_blocks(&mut self, records: Vec<Record>) -> Result<usize> {
        let capacity = DataBlock::max_records_per_block(self.page_size).max(1);
        let mut block_count = 0;
        for chunk in records.chunks(capacity) {
            let mut block = DataBlock::new(-1);
            block.records.extend_from_slice(chunk);
            self.data.track_new(block);
            block_count += 1;
        }
        self.data.write_all_cached()?;
        Ok(block_count)
    }

    /// Commits every cached page across all three families to disk, then
    /// drops the caches so subsequent access counters start from zero.
    pub fn flush_blocks(&mut self) -> Result<()> {
        self.data.write_all_cached()?;
        self.index.write_all_cached()?;
        self.overflow.write_all_cached()?;
        self.data.delete_all_without_writing();
        self.index.delete_all_without_writing();
        self.overflow.delete_all_without_writing();
        Ok(())
    }

    /// Drops all caches without writing. Used when the on-disk state is
    /// already authoritative (e.g. right after `flush_blocks`).
    pub fn flush_cache_without_writing(&mut self) {
        self.data.delete_all_without_writing();
        self.index.delete_all_without_writing();
        self.overflow.delete_all_without_writing();
    }

    pub fn loaded_data_block_count(&self) -> usize {
        self.data.loaded_count()
    }

    pub fn loaded_index_block_count(&self) -> usize {
        self.index.loaded_count()
    }
}

/// Largest degree whose leaf node fits within one page, given the fixed
/// per-key and per-pointer payload sizes from §6's wire format. Exposed for
/// the CLI to use as a default; callers may override it with any degree.
pub fn optimal_degree(page_size: usize) -> usize {
    // Header: is_leaf(1) + degree(2) + size(2) = 5 bytes.
    // Per key (leaf): float key (4) + one-pointer NodeRecords (1 + 6 + 1 = 8).
    const HEADER: usize = 5;
    const PER_ENTRY: usize = 4 + 8;
    const NEXT_LEAF_POINTER: usize = 1 + 4;

    let usable = page_size.saturating_sub(HEADER).saturating_sub(NEXT_LEAF_POINTER);
    (usable / PER_ENTRY).max(2)
}
