//! Unsynchronised first-fit block allocator over a fixed arena.
//!
//! [`BlockArena`] owns the arena bytes and the handle table. Every block
//! header lives inside the arena (see [`crate::block`]); the headers form
//! an address-ordered doubly-linked list that partitions the arena with no
//! gaps. All mutating methods take `&mut self`; [`HandlePool`] wraps a
//! `BlockArena` in a mutex for shared use.
//!
//! [`HandlePool`]: crate::HandlePool

use std::ops::Range;
use std::ptr::NonNull;

use cairn_core::{BlockInfo, Handle, PoolError, PoolStats};

use crate::block::{set_prev, BlockHeader};
use crate::config::{PoolConfig, PoolLayout};
use crate::handle_table::HandleTable;
use crate::raw::RawArena;

/// Single-owner handle allocator.
///
/// Invariants maintained by every method:
/// - The first block starts at offset 0 and the last block ends at
///   `pool_size`; each block's `next` is `offset + header_size + size`.
/// - `prev`/`next` links agree in both directions.
/// - No two adjacent blocks are both free.
/// - A block is in use iff a handle-table slot points at it, and that
///   handle is recorded in the block header.
pub struct BlockArena {
    pub(crate) layout: PoolLayout,
    pub(crate) raw: RawArena,
    pub(crate) handles: HandleTable,
}

impl BlockArena {
    /// Create an arena from a configuration.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        Ok(Self::with_layout(config.validate()?))
    }

    /// Create an arena from an already validated layout.
    pub(crate) fn with_layout(layout: PoolLayout) -> Self {
        let mut arena = Self {
            layout,
            raw: RawArena::new(layout.pool_size),
            handles: HandleTable::new(layout.max_handles),
        };
        arena.reset_blocks();
        arena
    }

    /// Write a single free block spanning the whole arena.
    fn reset_blocks(&mut self) {
        let head = BlockHeader::free(self.layout.pool_size - self.layout.header_size, None, None);
        head.write(self.raw.bytes_mut(), 0);
    }

    /// The validated geometry of this arena.
    pub fn layout(&self) -> &PoolLayout {
        &self.layout
    }

    /// Arena capacity in bytes.
    pub fn pool_size(&self) -> usize {
        self.layout.pool_size
    }

    /// Bytes consumed by each block header.
    pub fn header_size(&self) -> usize {
        self.layout.header_size
    }

    /// Smallest split remainder kept as its own free block.
    pub fn minimal_block_size(&self) -> usize {
        self.layout.minimal_block_size
    }

    /// Handle table capacity.
    pub fn max_handles(&self) -> usize {
        self.handles.capacity()
    }

    /// Number of live allocations.
    pub fn handles_in_use(&self) -> usize {
        self.handles.in_use()
    }

    pub(crate) fn header(&self, offset: usize) -> BlockHeader {
        BlockHeader::read(self.raw.bytes(), offset)
    }

    fn put_header(&mut self, offset: usize, header: &BlockHeader) {
        header.write(self.raw.bytes_mut(), offset);
    }

    /// Walk the block list in address order.
    pub(crate) fn walk(&self) -> BlockWalk<'_> {
        BlockWalk {
            bytes: self.raw.bytes(),
            next: Some(0),
        }
    }

    /// Describe every block in address order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        let header_size = self.layout.header_size;
        self.walk().map(move |(offset, b)| BlockInfo {
            offset,
            payload_offset: offset + header_size,
            size: b.size,
            is_free: b.is_free,
            handle: if b.is_free { None } else { b.handle },
        })
    }

    /// Allocate at least `size` payload bytes.
    ///
    /// First-fit over the address-ordered block list. The chosen block is
    /// split when the remainder can hold a header plus a minimal block;
    /// otherwise it is claimed whole. On any error the arena is left
    /// exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidSize`] if `size` is zero or larger than
    ///   `pool_size - header_size`.
    /// - [`PoolError::HandleTableFull`] if a block fits but every handle
    ///   is bound.
    /// - [`PoolError::AllocationFailed`] if no free block is large enough.
    pub fn alloc(&mut self, size: usize) -> Result<Handle, PoolError> {
        let limit = self.layout.max_request();
        if size == 0 || size > limit {
            return Err(PoolError::InvalidSize {
                requested: size,
                limit,
            });
        }
        let size = self
            .layout
            .align_up(size)
            .ok_or(PoolError::InvalidSize {
                requested: size,
                limit,
            })?;

        let Some((offset, block)) = self.walk().find(|(_, b)| b.is_free && b.size >= size)
        else {
            let largest_free = self.max_allocatable_size();
            tracing::debug!(requested = size, largest_free, "pool allocation failed");
            return Err(PoolError::AllocationFailed {
                requested: size,
                largest_free,
            });
        };

        // Bind the handle before touching any header so that a full table
        // leaves the block list untouched.
        let Some(handle) = self.handles.acquire(offset) else {
            tracing::debug!(
                requested = size,
                capacity = self.handles.capacity(),
                "pool handle table full"
            );
            return Err(PoolError::HandleTableFull {
                capacity: self.handles.capacity(),
            });
        };

        let header_size = self.layout.header_size;
        let mut claimed = block;
        if block.size >= size + header_size + self.layout.minimal_block_size {
            let split_at = offset + header_size + size;
            let remainder = BlockHeader::free(block.size - size - header_size, Some(offset), block.next);
            let bytes = self.raw.bytes_mut();
            remainder.write(bytes, split_at);
            if let Some(next) = block.next {
                set_prev(bytes, next, Some(split_at));
            }
            claimed.next = Some(split_at);
            claimed.size = size;
        }
        claimed.is_free = false;
        claimed.handle = Some(handle);
        self.put_header(offset, &claimed);

        tracing::trace!(%handle, offset, size = claimed.size, "pool alloc");
        Ok(handle)
    }

    /// Release an allocation.
    ///
    /// The block is merged with its successor if that is free, then with
    /// its predecessor if that is free, so a single call can close a
    /// three-block gap.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidHandle`] if the handle is out of range or
    ///   not bound.
    /// - [`PoolError::DoubleFreeAttempt`] if the bound block is already
    ///   marked free.
    pub fn free(&mut self, handle: Handle) -> Result<(), PoolError> {
        let offset = self
            .handles
            .resolve(handle)
            .ok_or(PoolError::InvalidHandle { handle })?;
        let mut block = self.header(offset);
        if block.is_free {
            return Err(PoolError::DoubleFreeAttempt { handle });
        }

        self.handles.release(handle);
        block.is_free = true;
        block.handle = None;

        let header_size = self.layout.header_size;
        if let Some(next_off) = block.next {
            let next = self.header(next_off);
            if next.is_free {
                block.size += header_size + next.size;
                block.next = next.next;
                if let Some(after) = next.next {
                    set_prev(self.raw.bytes_mut(), after, Some(offset));
                }
            }
        }

        if let Some(prev_off) = block.prev {
            let mut prev = self.header(prev_off);
            if prev.is_free {
                prev.size += header_size + block.size;
                prev.next = block.next;
                if let Some(after) = block.next {
                    set_prev(self.raw.bytes_mut(), after, Some(prev_off));
                }
                self.put_header(prev_off, &prev);
                tracing::trace!(%handle, offset = prev_off, size = prev.size, "pool free");
                return Ok(());
            }
        }

        self.put_header(offset, &block);
        tracing::trace!(%handle, offset, size = block.size, "pool free");
        Ok(())
    }

    /// Arena byte range of a live handle's payload.
    fn payload_range(&self, handle: Handle) -> Option<Range<usize>> {
        let offset = self.handles.resolve(handle)?;
        let block = self.header(offset);
        if block.is_free {
            return None;
        }
        let start = offset + self.layout.header_size;
        Some(start..start + block.size)
    }

    /// Borrow a live allocation's payload.
    ///
    /// The slice covers the full usable capacity, which may exceed the
    /// requested size by alignment rounding or an unsplit block.
    pub fn payload(&self, handle: Handle) -> Option<&[u8]> {
        let range = self.payload_range(handle)?;
        Some(&self.raw.bytes()[range])
    }

    /// Mutably borrow a live allocation's payload.
    pub fn payload_mut(&mut self, handle: Handle) -> Option<&mut [u8]> {
        let range = self.payload_range(handle)?;
        Some(&mut self.raw.bytes_mut()[range])
    }

    /// Raw address of a live allocation's payload.
    ///
    /// The address stays valid until the handle is freed or the arena is
    /// defragmented. Prefer [`payload`](Self::payload), whose borrow
    /// cannot outlive either event.
    pub fn get_pointer(&mut self, handle: Handle) -> Option<NonNull<u8>> {
        let range = self.payload_range(handle)?;
        NonNull::new(self.raw.bytes_mut().as_mut_ptr().wrapping_add(range.start))
    }

    /// Usable payload capacity of a live allocation.
    pub fn payload_len(&self, handle: Handle) -> Result<usize, PoolError> {
        self.payload_range(handle)
            .map(|r| r.len())
            .ok_or(PoolError::InvalidHandle { handle })
    }

    /// Copy payload bytes `[offset, offset + buf.len())` into `buf`.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHandle`] for a dead handle,
    /// [`PoolError::InvalidSize`] if the span leaves the payload.
    pub fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), PoolError> {
        let payload = self.payload(handle).ok_or(PoolError::InvalidHandle { handle })?;
        let span = checked_span(offset, buf.len(), payload.len())?;
        buf.copy_from_slice(&payload[span]);
        Ok(())
    }

    /// Copy `data` into the payload starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHandle`] for a dead handle,
    /// [`PoolError::InvalidSize`] if the span leaves the payload.
    pub fn write(&mut self, handle: Handle, offset: usize, data: &[u8]) -> Result<(), PoolError> {
        let payload = self
            .payload_mut(handle)
            .ok_or(PoolError::InvalidHandle { handle })?;
        let span = checked_span(offset, data.len(), payload.len())?;
        payload[span].copy_from_slice(data);
        Ok(())
    }

    /// Largest request satisfiable without defragmenting.
    ///
    /// For each free block, a header is reserved when the block is big
    /// enough to be split; the result is rounded down to the alignment.
    pub fn max_allocatable_size(&self) -> usize {
        let header_size = self.layout.header_size;
        let split_threshold = self.layout.minimal_block_size + header_size;
        self.walk()
            .filter(|(_, b)| b.is_free)
            .map(|(_, b)| {
                let usable = if b.size >= split_threshold {
                    b.size - header_size
                } else {
                    b.size
                };
                self.layout.align_down(usable)
            })
            .max()
            .unwrap_or(0)
    }

    /// Sum of all free block payload sizes.
    pub fn total_free_memory(&self) -> usize {
        self.walk()
            .filter(|(_, b)| b.is_free)
            .map(|(_, b)| b.size)
            .sum()
    }

    /// Usage summary in a single walk.
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            pool_size: self.layout.pool_size,
            header_size: self.layout.header_size,
            handles_in_use: self.handles.in_use(),
            max_handles: self.handles.capacity(),
            ..PoolStats::default()
        };
        for (_, b) in self.walk() {
            if b.is_free {
                stats.free_blocks += 1;
                stats.total_free += b.size;
                stats.largest_free_block = stats.largest_free_block.max(b.size);
            } else {
                stats.live_blocks += 1;
            }
        }
        stats.max_allocatable = self.max_allocatable_size();
        stats
    }

    /// Verify every structural invariant of the block list and handle
    /// table.
    ///
    /// Intended for tests and debug tooling; costs one walk of the list
    /// plus one pass over the handle table.
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        let header_size = self.layout.header_size;
        let pool_size = self.layout.pool_size;
        let max_blocks = pool_size / header_size;

        let mut expected = Some(0usize);
        let mut prev: Option<(usize, BlockHeader)> = None;
        let mut live = 0usize;
        let mut visited = 0usize;

        while let Some(offset) = expected {
            visited += 1;
            if visited > max_blocks {
                return Err(corrupt(format!("block list longer than {max_blocks} blocks")));
            }
            if offset % self.layout.alignment != 0 {
                return Err(corrupt(format!("block at {offset} is not aligned")));
            }
            if offset + header_size > pool_size {
                return Err(corrupt(format!("header at {offset} overruns the arena")));
            }
            let b = self.header(offset);
            if b.prev != prev.map(|(o, _)| o) {
                return Err(corrupt(format!("block at {offset} has a stale prev link")));
            }
            let end = offset
                .checked_add(header_size)
                .and_then(|v| v.checked_add(b.size))
                .filter(|&e| e <= pool_size)
                .ok_or_else(|| corrupt(format!("block at {offset} overruns the arena")))?;
            let expected_next = (end < pool_size).then_some(end);
            if b.next != expected_next {
                return Err(corrupt(format!(
                    "block at {offset} links to {:?}, expected {expected_next:?}",
                    b.next
                )));
            }
            if let Some((prev_off, p)) = prev {
                if p.is_free && b.is_free {
                    return Err(corrupt(format!(
                        "adjacent free blocks at {prev_off} and {offset}"
                    )));
                }
            }
            if !b.is_free {
                live += 1;
                let handle = b
                    .handle
                    .ok_or_else(|| corrupt(format!("live block at {offset} has no handle")))?;
                if self.handles.resolve(handle) != Some(offset) {
                    return Err(corrupt(format!(
                        "handle {handle} does not resolve to its block at {offset}"
                    )));
                }
            }
            prev = Some((offset, b));
            expected = b.next;
        }

        if live != self.handles.in_use() {
            return Err(corrupt(format!(
                "{live} live blocks but {} bound handles",
                self.handles.in_use()
            )));
        }
        for (handle, offset) in self.handles.bound() {
            let b = self.header(offset);
            if b.is_free || b.handle != Some(handle) {
                return Err(corrupt(format!(
                    "handle {handle} points at a block it does not own ({offset})"
                )));
            }
        }
        Ok(())
    }

    /// Flip a live block to free without unbinding its handle, leaving a
    /// stale table slot behind.
    #[cfg(test)]
    pub(crate) fn mark_free_leaving_stale_slot(&mut self, handle: Handle) {
        if let Some(offset) = self.handles.resolve(handle) {
            let mut b = self.header(offset);
            b.is_free = true;
            self.put_header(offset, &b);
        }
    }
}

fn checked_span(offset: usize, len: usize, capacity: usize) -> Result<Range<usize>, PoolError> {
    offset
        .checked_add(len)
        .filter(|&end| end <= capacity)
        .map(|end| offset..end)
        .ok_or(PoolError::InvalidSize {
            requested: offset.saturating_add(len),
            limit: capacity,
        })
}

fn corrupt(reason: String) -> PoolError {
    PoolError::Internal { reason }
}

/// Address-ordered iterator over `(offset, header)` pairs.
pub(crate) struct BlockWalk<'a> {
    bytes: &'a [u8],
    next: Option<usize>,
}

impl Iterator for BlockWalk<'_> {
    type Item = (usize, BlockHeader);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.next?;
        let header = BlockHeader::read(self.bytes, offset);
        self.next = header.next;
        Some((offset, header))
    }
}
