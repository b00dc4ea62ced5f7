//! Read-only views of pool state: block descriptors, usage statistics,
//! and defragmentation reports.

use crate::id::Handle;

/// Descriptor of one arena block, as seen by a diagnostic walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Byte offset of the block header within the arena.
    pub offset: usize,
    /// Byte offset of the first payload byte within the arena.
    pub payload_offset: usize,
    /// Payload capacity in bytes (excluding the header).
    pub size: usize,
    /// Whether the block is on the free list.
    pub is_free: bool,
    /// Owning handle; `None` for free blocks.
    pub handle: Option<Handle>,
}

/// Point-in-time usage summary of a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Arena capacity in bytes.
    pub pool_size: usize,
    /// Bytes consumed by each block header.
    pub header_size: usize,
    /// Number of blocks in use.
    pub live_blocks: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Sum of free block payload sizes.
    pub total_free: usize,
    /// Payload size of the largest free block.
    pub largest_free_block: usize,
    /// Largest request satisfiable without defragmenting.
    pub max_allocatable: usize,
    /// Handles currently bound to allocations.
    pub handles_in_use: usize,
    /// Handle table capacity.
    pub max_handles: usize,
}

impl PoolStats {
    /// External fragmentation in `[0.0, 1.0]`.
    ///
    /// `0.0` when all free memory sits in one block (or none is free);
    /// approaches `1.0` as free memory is scattered across many blocks.
    pub fn fragmentation(&self) -> f64 {
        if self.total_free == 0 {
            return 0.0;
        }
        1.0 - self.largest_free_block as f64 / self.total_free as f64
    }
}

/// Outcome of a defragmentation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefragReport {
    /// Live blocks whose address changed.
    pub blocks_moved: usize,
    /// Payload bytes copied to new locations.
    pub bytes_moved: usize,
    /// Free blocks present before compaction.
    pub free_blocks_before: usize,
    /// `max_allocatable_size` before compaction.
    pub largest_free_before: usize,
    /// `max_allocatable_size` after compaction.
    pub largest_free_after: usize,
}
