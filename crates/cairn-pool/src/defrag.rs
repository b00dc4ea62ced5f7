//! In-place compaction.
//!
//! Live blocks slide toward offset 0 in address order and their handles
//! are rebound, so handle values survive while payload addresses change.
//! The pass runs in two phases: a read-only plan, then an ascending apply.
//! Every block's new offset is at or below its old one, so applying in
//! ascending order never overwrites bytes that are still waiting to move:
//! each payload is copied before its header is rewritten, and both land
//! strictly below the next block's source.

use smallvec::SmallVec;

use cairn_core::{DefragReport, Handle, PoolError};

use crate::arena::BlockArena;
use crate::block::BlockHeader;

/// One live block's move.
#[derive(Clone, Copy, Debug)]
struct Relocation {
    handle: Handle,
    from: usize,
    to: usize,
    /// Payload bytes to carry over.
    len: usize,
    /// Payload capacity after compaction.
    size: usize,
}

/// Result of the planning phase.
struct CompactionPlan {
    moves: SmallVec<[Relocation; 16]>,
    /// Offset and payload size of the trailing free block, if any.
    tail: Option<(usize, usize)>,
}

impl BlockArena {
    /// Compact all live blocks toward the start of the arena.
    ///
    /// Afterwards at most one free block exists and it is the last block.
    /// Handle values are unchanged; previously obtained pointers and
    /// payload offsets are invalidated. A block that ended at an unaligned
    /// arena end gives its sub-alignment slack back to the free tail, so
    /// its `payload_len` may drop to the aligned size it was rounded from.
    /// Neither free space nor the largest allocatable request ever shrinks.
    ///
    /// # Errors
    ///
    /// [`PoolError::Internal`] if the block list is inconsistent. This is
    /// detected while planning, before any byte is moved.
    pub fn defragment(&mut self) -> Result<DefragReport, PoolError> {
        let stats = self.stats();
        let plan = self.plan_compaction()?;

        let header_size = self.layout.header_size;
        let mut report = DefragReport {
            free_blocks_before: stats.free_blocks,
            largest_free_before: stats.max_allocatable,
            ..DefragReport::default()
        };

        for (i, mv) in plan.moves.iter().enumerate() {
            if mv.from != mv.to {
                let src = mv.from + header_size;
                self.raw
                    .bytes_mut()
                    .copy_within(src..src + mv.len, mv.to + header_size);
                report.blocks_moved += 1;
                report.bytes_moved += mv.len;
            }
            let prev = i.checked_sub(1).map(|p| plan.moves[p].to);
            let next = plan
                .moves
                .get(i + 1)
                .map(|n| n.to)
                .or(plan.tail.map(|(offset, _)| offset));
            let header = BlockHeader {
                size: mv.size,
                is_free: false,
                next,
                prev,
                handle: Some(mv.handle),
            };
            header.write(self.raw.bytes_mut(), mv.to);
            self.handles.rebind(mv.handle, mv.to);
        }

        if let Some((offset, size)) = plan.tail {
            let prev = plan.moves.last().map(|m| m.to);
            BlockHeader::free(size, prev, None).write(self.raw.bytes_mut(), offset);
        }

        report.largest_free_after = self.max_allocatable_size();
        tracing::debug!(
            blocks_moved = report.blocks_moved,
            bytes_moved = report.bytes_moved,
            free_blocks_before = report.free_blocks_before,
            largest_free_before = report.largest_free_before,
            largest_free_after = report.largest_free_after,
            "pool defragmented"
        );
        Ok(report)
    }

    /// Compute destinations for every live block without touching the
    /// arena.
    fn plan_compaction(&self) -> Result<CompactionPlan, PoolError> {
        let layout = self.layout;
        let mut moves: SmallVec<[Relocation; 16]> = SmallVec::new();
        let mut cursor = 0usize;

        for (offset, block) in self.walk() {
            if block.is_free {
                continue;
            }
            let handle = block.handle.ok_or_else(|| PoolError::Internal {
                reason: format!("live block at {offset} has no handle"),
            })?;
            // Only a block ending the arena can have an unaligned size; the
            // bytes past the last alignment unit lie beyond any request.
            let size = layout.align_down(block.size);
            moves.push(Relocation {
                handle,
                from: offset,
                to: cursor,
                len: size,
                size,
            });
            cursor += layout.header_size + size;
        }

        let residual = layout.pool_size - cursor;
        let tail = if residual >= layout.minimal_block_size {
            Some((cursor, residual - layout.header_size))
        } else {
            // Only trimmed slack is left: the last live block keeps it so
            // the partition stays gapless.
            if let Some(last) = moves.last_mut() {
                last.size += residual;
            }
            None
        };

        Ok(CompactionPlan { moves, tail })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PoolConfig;

    use super::*;

    fn arena(pool_size: usize) -> BlockArena {
        BlockArena::new(PoolConfig::new(pool_size)).unwrap()
    }

    #[test]
    fn empty_arena_defrag_is_a_no_op() {
        let mut a = arena(1024);
        let report = a.defragment().unwrap();
        assert_eq!(report.blocks_moved, 0);
        assert_eq!(report.free_blocks_before, 1);
        assert_eq!(a.stats().free_blocks, 1);
        assert_eq!(a.total_free_memory(), 976);
        a.check_invariants().unwrap();
    }

    #[test]
    fn compaction_closes_gaps_and_keeps_handles() {
        let mut a = arena(2048);
        let h0 = a.alloc(400).unwrap();
        let h1 = a.alloc(400).unwrap();
        let h2 = a.alloc(400).unwrap();
        a.payload_mut(h0).unwrap().fill(0xAA);
        a.payload_mut(h2).unwrap().fill(0xCC);
        a.free(h1).unwrap();
        assert!(a.alloc(800).is_err());

        let report = a.defragment().unwrap();
        assert_eq!(report.blocks_moved, 1);
        assert_eq!(report.bytes_moved, 400);
        assert_eq!(report.free_blocks_before, 2);
        assert!(report.largest_free_after > report.largest_free_before);

        let blocks: Vec<_> = a.blocks().collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!((blocks[1].offset, blocks[1].handle), (448, Some(h2)));
        assert_eq!((blocks[2].offset, blocks[2].size), (896, 1104));
        assert!(a.payload(h0).unwrap().iter().all(|&b| b == 0xAA));
        assert!(a.payload(h2).unwrap().iter().all(|&b| b == 0xCC));
        a.check_invariants().unwrap();

        assert!(a.alloc(800).is_ok());
    }

    #[test]
    fn overlapping_moves_preserve_contents() {
        let mut a = arena(4096);
        let small = a.alloc(16).unwrap();
        let big = a.alloc(1024).unwrap();
        let pattern: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
        a.write(big, 0, &pattern).unwrap();
        a.free(small).unwrap();

        a.defragment().unwrap();
        assert_eq!(a.blocks().next().unwrap().handle, Some(big));
        assert_eq!(a.payload(big).unwrap(), &pattern[..]);
        a.check_invariants().unwrap();
    }

    #[test]
    fn whole_claimed_block_moves_and_leaves_one_tail() {
        let mut a = arena(1024);
        let h0 = a.alloc(100).unwrap();
        // 816 free bytes remain; requesting 768 is too close to split.
        let h1 = a.alloc(a.max_allocatable_size()).unwrap();
        assert_eq!(a.payload_len(h1).unwrap(), 816);
        assert_eq!(a.total_free_memory(), 0);
        a.free(h0).unwrap();

        a.defragment().unwrap();
        let blocks: Vec<_> = a.blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].offset, blocks[0].size), (0, 816));
        assert_eq!((blocks[1].offset, blocks[1].size, blocks[1].is_free), (864, 112, true));
        a.check_invariants().unwrap();
    }

    #[test]
    fn unaligned_slack_returns_to_free_space() {
        let mut a = arena(1000);
        let h0 = a.alloc(16).unwrap();
        let h1 = a.alloc(800).unwrap();
        // The second block takes the whole 888-byte remainder.
        assert_eq!(a.payload_len(h1).unwrap(), 888);
        a.payload_mut(h1).unwrap()[..800].fill(0x5A);
        a.free(h0).unwrap();
        let max_before = a.max_allocatable_size();
        let free_before = a.total_free_memory();
        assert_eq!((max_before, free_before), (16, 16));

        a.defragment().unwrap();
        let blocks: Vec<_> = a.blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].offset, blocks[0].size, blocks[0].handle), (0, 880, Some(h1)));
        assert_eq!((blocks[1].offset, blocks[1].size, blocks[1].is_free), (928, 24, true));
        assert!(a.max_allocatable_size() >= max_before);
        assert!(a.total_free_memory() >= free_before);
        assert!(a.payload(h1).unwrap()[..800].iter().all(|&b| b == 0x5A));
        a.check_invariants().unwrap();
        assert!(a.alloc(16).is_ok());
    }

    #[test]
    fn full_unaligned_pool_keeps_its_slack() {
        let mut a = arena(1000);
        let h = a.alloc(900).unwrap();
        assert_eq!(a.payload_len(h).unwrap(), 952);

        let report = a.defragment().unwrap();
        assert_eq!(report.blocks_moved, 0);
        let blocks: Vec<_> = a.blocks().collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].offset, blocks[0].size), (0, 952));
        a.check_invariants().unwrap();
    }

    #[test]
    fn defrag_is_idempotent() {
        let mut a = arena(2048);
        let hs: Vec<_> = (0..6).map(|_| a.alloc(100).unwrap()).collect();
        a.free(hs[1]).unwrap();
        a.free(hs[4]).unwrap();
        a.defragment().unwrap();
        let snapshot: Vec<_> = a.blocks().collect();
        let second = a.defragment().unwrap();
        assert_eq!(second.blocks_moved, 0);
        assert_eq!(a.blocks().collect::<Vec<_>>(), snapshot);
    }

    #[test]
    fn unaligned_last_block_is_trimmed_to_alignment() {
        let mut a = arena(1000);
        let h0 = a.alloc(64).unwrap();
        let h1 = a.alloc(64).unwrap();
        // Remainder 1000 - 224 = 776 -> free block of 728 at 224; claim it
        // whole so the last live block carries the unaligned tail.
        let h2 = a.alloc(700).unwrap();
        assert_eq!(a.payload_len(h2).unwrap(), 728);
        a.free(h0).unwrap();
        a.free(h1).unwrap();

        a.defragment().unwrap();
        a.check_invariants().unwrap();
        let blocks: Vec<_> = a.blocks().collect();
        assert_eq!((blocks[0].handle, blocks[0].size), (Some(h2), 720));
        assert_eq!((blocks[1].offset, blocks[1].size), (768, 184));
        assert!(blocks[1].is_free);
        assert!(a.payload_len(h2).unwrap() >= 700);
    }
}
