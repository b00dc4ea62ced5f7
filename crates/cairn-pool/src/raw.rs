//! Aligned backing storage for the arena.
//!
//! The arena is a boxed slice of [`MAX_ALIGN`]-aligned chunks viewed as
//! plain bytes through `bytemuck`, so every offset that is a multiple of
//! the configured alignment is also an aligned address.

use bytemuck::{Pod, Zeroable};

use crate::config::MAX_ALIGN;

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, align(16))]
struct Chunk([u8; MAX_ALIGN]);

const _: () = assert!(std::mem::align_of::<Chunk>() == MAX_ALIGN);

/// Fixed-size, zero-initialised, maximally aligned byte buffer.
///
/// Never resized after construction; the heap allocation does not move
/// for the lifetime of the value, so payload addresses are stable between
/// defragmentation passes.
pub(crate) struct RawArena {
    chunks: Box<[Chunk]>,
    len: usize,
}

impl RawArena {
    /// Allocate `len` zeroed bytes.
    pub(crate) fn new(len: usize) -> Self {
        let chunk_count = len.div_ceil(MAX_ALIGN);
        Self {
            chunks: vec![Chunk::zeroed(); chunk_count].into_boxed_slice(),
            len,
        }
    }

    #[inline]
    pub(crate) fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<Chunk, u8>(&self.chunks)[..self.len]
    }

    #[inline]
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<Chunk, u8>(&mut self.chunks)[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_arena_is_zeroed() {
        let arena = RawArena::new(100);
        assert_eq!(arena.bytes().len(), 100);
        assert!(arena.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn base_address_is_max_aligned() {
        let arena = RawArena::new(1024);
        assert_eq!(arena.bytes().as_ptr() as usize % MAX_ALIGN, 0);
    }

    #[test]
    fn unaligned_length_is_truncated_view() {
        let mut arena = RawArena::new(17);
        assert_eq!(arena.bytes_mut().len(), 17);
        arena.bytes_mut()[16] = 0xFF;
        assert_eq!(arena.bytes()[16], 0xFF);
    }
}
