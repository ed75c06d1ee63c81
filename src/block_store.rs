//! Per-family in-memory cache over a directory of fixed-size page files.
//!
//! Grounded in the original `storage/block_storage_impl.h`'s `BlockStorage<T>`
//! template: generic over a page type that knows its own id, can be built
//! from a stream, and can serialize itself back out. The Rust rendition
//! expresses "generic over a page type with this shape" as a trait bound
//! instead of C++ template duck-typing.

use crate::error::{Result, StorageError};
use crate::serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use log::debug;

/// A page that a [`BlockStore`] can own: it knows its own id, can be read off
/// a byte stream given that id, and can serialize itself back out.
pub trait Page: Sized {
    fn id(&self) -> i32;
    fn set_id(&mut self, id: i32);
    fn from_reader(id: i32, r: &mut impl Read) -> Result<Self>;
    fn write_to(&self, w: &mut impl Write) -> Result<()>;
}

/// Read-through, write-all-on-flush cache for one block family (data, index,
/// or overflow). Every page touched stays resident until an explicit flush —
/// there is no LRU eviction, matching the source's cache replacement policy
/// (or lack of one).
pub struct BlockStore<T: Page> {
    /// Full path prefix, e.g. `/db/data_`; the block id and `.dat` are
    /// appended directly to form the file name.
    prefix: String,
    next_id: i32,
    cache: BTreeMap<i32, T>,
}

impl<T: Page> BlockStore<T> {
    pub fn new(prefix: impl Into<String>, existing_block_count: i32) -> Self {
        BlockStore {
            prefix: prefix.into(),
            next_id: existing_block_count,
            cache: BTreeMap::new(),
        }
    }

    fn path_for(&self, id: i32) -> String {
        format!("{}{}.dat", self.prefix, id)
    }

    /// Returns the cached page if present; otherwise reads it off disk,
    /// caches it, and returns it. Fails if the backing file is missing.
    pub fn get(&mut self, id: i32) -> Result<&T> {
        if !self.cache.contains_key(&id) {
            self.load(id)?;
        }
        Ok(self.cache.get(&id).expect("just loaded or already cached"))
    }

    /// Same as [`BlockStore::get`] but returns a mutable borrow, for callers
    /// that mutate a page in place (node splits, overflow appends).
    pub fn get_mut(&mut self, id: i32) -> Result<&mut T> {
        if !self.cache.contains_key(&id) {
            self.load(id)?;
        }
        Ok(self.cache.get_mut(&id).expect("just loaded or already cached"))
    }

    fn load(&mut self, id: i32) -> Result<()> {
        let path = self.path_for(id);
        let file = File::open(&path).map_err(|_| StorageError::BlockNotFound {
            prefix: self.prefix.clone(),
            id,
        })?;
        let mut reader = BufReader::new(file);
        let page = T::from_reader(id, &mut reader)?;
        serialize::is_eof(&mut reader)?;
        debug!("block_store: loaded block {id} from {path}");
        self.cache.insert(id, page);
        Ok(())
    }

    /// Assigns the next sequential id, inserts the page into the cache, and
    /// returns the assigned id. The page is not written to disk yet.
    pub fn track_new(&mut self, mut page: T) -> i32 {
        let id = self.next_id;
        page.set_id(id);
        self.cache.insert(id, page);
        self.next_id += 1;
        id
    }

    /// Writes every cached page to `<prefix><id>.dat`. Does not evict.
    pub fn write_all_cached(&self) -> Result<()> {
        for (id, page) in &self.cache {
            let path = self.path_for(*id);
            let file = File::create(&path)?;
            let mut writer = BufWriter::new(file);
            page.write_to(&mut writer)?;
            writer.flush()?;
            debug!("block_store: wrote block {id} to {path}");
        }
        Ok(())
    }

    /// Drops all cached pages without writing. Used to clear the cache
    /// between benchmark runs without losing the on-disk state.
    pub fn delete_all_without_writing(&mut self) {
        self.cache.clear();
    }

    pub fn loaded_count(&self) -> usize {
        self.cache.len()
    }

    pub fn next_id(&self) -> i32 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Toy {
        id: i32,
        value: u8,
    }

    impl Page for Toy {
        fn id(&self) -> i32 {
            self.id
        }
        fn set_id(&mut self, id: i32) {
            self.id = id;
        }
        fn from_reader(id: i32, r: &mut impl Read) -> Result<Self> {
            let mut buf = [0u8; 1];
            r.read_exact(&mut buf)?;
            Ok(Toy { id, value: buf[0] })
        }
        fn write_to(&self, w: &mut impl Write) -> Result<()> {
            w.write_all(&[self.value])?;
            Ok(())
        }
    }

    #[test]
    fn track_new_assigns_sequential_ids_and_caches() {
        let prefix = tempdir_prefix();
        let mut store: BlockStore<Toy> = BlockStore::new(prefix, 0);
        let a = store.track_new(Toy { id: -1, value: 1 });
        let b = store.track_new(Toy { id: -1, value: 2 });
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(store.loaded_count(), 2);
    }

    #[test]
    fn write_then_reopen_round_trips() {
        let prefix = tempdir_prefix();
        {
            let mut store: BlockStore<Toy> = BlockStore::new(prefix.clone(), 0);
            store.track_new(Toy { id: -1, value: 42 });
            store.write_all_cached().unwrap();
            store.delete_all_without_writing();
            assert_eq!(store.loaded_count(), 0);
        }
        let mut reopened: BlockStore<Toy> = BlockStore::new(prefix, 1);
        let loaded = reopened.get(0).unwrap();
        assert_eq!(loaded.value, 42);
    }

    #[test]
    fn missing_block_is_an_error() {
        let prefix = tempdir_prefix();
        let mut store: BlockStore<Toy> = BlockStore::new(prefix, 0);
        assert!(store.get(7).is_err());
    }

    fn tempdir_prefix() -> String {
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "fgpct_bptree_test_{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        format!("{}/toy_", dir.display())
    }
}
