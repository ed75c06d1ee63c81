//! Append-only extension chain for record pointers sharing one key.
//!
//! A leaf slot holds up to `IN_BLOCK_RECORDS` pointers inline; once that
//! fills up, further pointers for the same key spill into a singly linked
//! chain of `OverflowBlock`s. The chain is append-only: a non-terminal block
//! is always full, and `push_back` walks to the terminal block before
//! writing.

use crate::block_store::{BlockStore, Page};
use crate::consts::MAX_OVERFLOW_BLOCKS;
use crate::error::{Result, StorageError};
use crate::record::RecordPointer;
use crate::serialize;
use std::io::{Read, Write};

#[derive(Debug, Clone, PartialEq)]
pub struct OverflowBlock {
    pub id: i32,
    pub pointers: Vec<RecordPointer>,
    pub next: Option<i32>,
}

impl OverflowBlock {
    pub fn new(id: i32) -> Self {
        OverflowBlock {
            id,
            pointers: Vec::new(),
            next: None,
        }
    }

    /// `floor((page_size - 4 - 5) / 6)`: 4 bytes for the count, 5 for the
    /// `has_next`/`next_id` tail, 6 bytes per pointer.
    pub fn max_count(page_size: usize) -> usize {
        (page_size.saturating_sub(4).saturating_sub(5)) / 6
    }

    pub fn is_full(&self, page_size: usize) -> bool {
        self.pointers.len() >= Self::max_count(page_size)
    }
}

impl Page for OverflowBlock {
    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn from_reader(id: i32, r: &mut impl Read) -> Result<Self> {
        let count = serialize::read_u32(r)? as usize;
        let mut pointers = Vec::with_capacity(count);
        for _ in 0..count {
            let block_id = serialize::read_i32(r)?;
            let offset = serialize::read_u16(r)?;
            pointers.push(RecordPointer { block_id, offset });
        }
        let has_next = serialize::read_bool(r)?;
        let next = if has_next {
            Some(serialize::read_i32(r)?)
        } else {
            None
        };
        Ok(OverflowBlock { id, pointers, next })
    }

    fn write_to(&self, w: &mut impl Write) -> Result<()> {
        serialize::write_u32(w, self.pointers.len() as u32)?;
        for ptr in &self.pointers {
            serialize::write_i32(w, ptr.block_id)?;
            serialize::write_u16(w, ptr.offset)?;
        }
        serialize::write_bool(w, self.next.is_some())?;
        if let Some(next) = self.next {
            serialize::write_i32(w, next)?;
        }
        Ok(())
    }
}

/// Appends `ptr` to the chain starting at `start` (if any), walking to the
/// terminal block through `store`. Returns the id of the chain's head block
/// (a freshly allocated one if `start` was `None`), for the caller to store
/// back into the leaf slot's overflow pointer.
pub fn push_back(
    store: &mut BlockStore<OverflowBlock>,
    start: Option<i32>,
    page_size: usize,
    ptr: RecordPointer,
) -> Result<i32> {
    let head = match start {
        Some(head) => head,
        None => {
            let block = OverflowBlock::new(-1);
            return Ok(store.track_new(block_with_one(block, ptr)));
        }
    };

    let mut current_id = head;
    for _ in 0..MAX_OVERFLOW_BLOCKS {
        let current = store.get(current_id)?;
        if let Some(next_id) = current.next {
            current_id = next_id;
            continue;
        }
        if current.is_full(page_size) {
            let new_block = OverflowBlock::new(-1);
            let new_id = store.track_new(block_with_one(new_block, ptr));
            store.get_mut(current_id)?.next = Some(new_id);
            return Ok(head);
        }
        store.get_mut(current_id)?.pointers.push(ptr);
        return Ok(head);
    }
    Err(StorageError::corruption(
        "overflow chain",
        format!("exceeded MAX_OVERFLOW_BLOCKS ({MAX_OVERFLOW_BLOCKS}) while appending"),
    ))
}

fn block_with_one(mut block: OverflowBlock, ptr: RecordPointer) -> OverflowBlock {
    block.pointers.push(ptr);
    block
}

/// Reads every pointer reachable from `start` through the overflow chain, in
/// insertion order.
pub fn collect_chain(
    store: &mut BlockStore<OverflowBlock>,
    start: i32,
) -> Result<Vec<RecordPointer>> {
    let mut result = Vec::new();
    let mut current_id = Some(start);
    for _ in 0..MAX_OVERFLOW_BLOCKS {
        let Some(id) = current_id else {
            return Ok(result);
        };
        let block = store.get(id)?;
        result.extend_from_slice(&block.pointers);
        current_id = block.next;
    }
    Err(StorageError::corruption(
        "overflow chain",
        format!("exceeded MAX_OVERFLOW_BLOCKS ({MAX_OVERFLOW_BLOCKS}) while reading"),
    ))
}
