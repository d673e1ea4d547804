//! Defines the shared block pool --- [`HeapDisk`].
//!
//! Every regular file in a store draws its blocks from one disk. The disk
//! enforces the pool capacity and keeps a bounded cache of freed blocks so
//! steady-state write/delete churn does not hit the allocator.

use parking_lot::Mutex;

use crate::block::Block;
use crate::error::{Error, Result};

/// In-memory block pool with a fixed capacity and a bounded free-block cache.
#[derive(Debug)]
pub struct HeapDisk {
    block_size: usize,
    max_block_count: usize,
    max_cached_block_count: usize,
    state: Mutex<DiskState>,
}

struct DiskState {
    allocated_block_count: usize,
    cache: Vec<Block>,
}

impl std::fmt::Debug for DiskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskState")
            .field("allocated_block_count", &self.allocated_block_count)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl HeapDisk {
    pub fn new(block_size: usize, max_block_count: usize, max_cached_block_count: usize) -> Self {
        assert!(block_size > 0, "block size must be positive");
        Self {
            block_size,
            max_block_count,
            max_cached_block_count,
            state: Mutex::new(DiskState { allocated_block_count: 0, cache: Vec::new() }),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn max_block_count(&self) -> usize {
        self.max_block_count
    }

    /// Total pool capacity in bytes.
    pub fn total_space(&self) -> u64 {
        self.max_block_count as u64 * self.block_size as u64
    }

    /// Bytes currently held by live files.
    pub fn allocated_space(&self) -> u64 {
        self.allocated_block_count() as u64 * self.block_size as u64
    }

    /// Bytes still available for allocation.
    pub fn unallocated_space(&self) -> u64 {
        self.total_space() - self.allocated_space()
    }

    pub fn allocated_block_count(&self) -> usize {
        self.state.lock().allocated_block_count
    }

    pub fn cached_block_count(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Appends `count` blocks to `blocks`, drawing from the free cache
    /// first and allocating zeroed blocks for the remainder.
    pub fn allocate(&self, blocks: &mut Vec<Block>, count: usize) -> Result<()> {
        let mut state = self.state.lock();
        let new_allocated = state.allocated_block_count + count;
        if new_allocated > self.max_block_count {
            return Err(Error::OutOfSpace);
        }

        let from_cache = count.min(state.cache.len());
        for _ in 0..from_cache {
            // Cache blocks were zeroed when freed, so holes read as zeros.
            let block = state.cache.pop().unwrap();
            blocks.push(block);
        }
        for _ in 0..count - from_cache {
            blocks.push(Block::zeroed(self.block_size));
        }

        state.allocated_block_count = new_allocated;
        Ok(())
    }

    /// Removes `count` blocks from the tail of `blocks`, moving as many as
    /// fit into the free cache and dropping the rest.
    pub fn free(&self, blocks: &mut Vec<Block>, count: usize) {
        let count = count.min(blocks.len());
        let mut state = self.state.lock();
        for _ in 0..count {
            let mut block = blocks.pop().unwrap();
            if state.cache.len() < self.max_cached_block_count {
                block.zero(0, block.len());
                state.cache.push(block);
            }
        }
        state.allocated_block_count -= count;
    }
}
