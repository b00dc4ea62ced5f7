//! Pools whose capacity is fixed at compile time.

use std::ops::Deref;

use cairn_core::{DefragReport, Handle, HandleAllocator, PoolError};

use crate::arena::BlockArena;
use crate::config::{PoolLayout, MAX_ALIGN};
use crate::pool::HandlePool;

/// A [`HandlePool`] whose arena size and handle count are const
/// parameters.
///
/// Invalid parameters are rejected when the type is instantiated, so
/// construction cannot fail. Alignment is always [`MAX_ALIGN`].
///
/// ```
/// use cairn_pool::FixedPool;
///
/// let pool: FixedPool<4096, 64> = FixedPool::new();
/// let h = pool.alloc(256).unwrap();
/// assert_eq!(pool.max_handles(), 64);
/// pool.free(h).unwrap();
/// ```
///
/// An arena too small for one block does not compile:
///
/// ```compile_fail
/// use cairn_pool::FixedPool;
///
/// let pool: FixedPool<64> = FixedPool::new();
/// ```
pub struct FixedPool<const POOL_SIZE: usize, const MAX_HANDLES: usize = 1024> {
    pool: HandlePool,
}

impl<const POOL_SIZE: usize, const MAX_HANDLES: usize> FixedPool<POOL_SIZE, MAX_HANDLES> {
    /// Create the pool with its whole arena as one free block.
    pub fn new() -> Self {
        const {
            assert!(
                POOL_SIZE >= PoolLayout::min_pool_size(MAX_ALIGN),
                "POOL_SIZE must hold one header plus one minimal block"
            );
            assert!(MAX_HANDLES >= 1, "MAX_HANDLES must be at least 1");
            assert!(
                MAX_HANDLES <= u32::MAX as usize,
                "MAX_HANDLES must fit in a u32"
            );
        }
        let layout = PoolLayout::at_max_align(POOL_SIZE, MAX_HANDLES);
        Self {
            pool: HandlePool::from_arena(BlockArena::with_layout(layout)),
        }
    }

    /// The underlying dynamically sized pool.
    pub fn as_pool(&self) -> &HandlePool {
        &self.pool
    }
}

impl<const POOL_SIZE: usize, const MAX_HANDLES: usize> Default
    for FixedPool<POOL_SIZE, MAX_HANDLES>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const POOL_SIZE: usize, const MAX_HANDLES: usize> Deref
    for FixedPool<POOL_SIZE, MAX_HANDLES>
{
    type Target = HandlePool;

    fn deref(&self) -> &HandlePool {
        &self.pool
    }
}

impl<const POOL_SIZE: usize, const MAX_HANDLES: usize> HandleAllocator
    for FixedPool<POOL_SIZE, MAX_HANDLES>
{
    fn alloc(&self, size: usize) -> Result<Handle, PoolError> {
        self.pool.alloc(size)
    }

    fn free(&self, handle: Handle) -> Result<(), PoolError> {
        self.pool.free(handle)
    }

    fn defragment(&self) -> Result<DefragReport, PoolError> {
        self.pool.defragment()
    }

    fn max_allocatable_size(&self) -> Result<usize, PoolError> {
        self.pool.max_allocatable_size()
    }

    fn total_free_memory(&self) -> Result<usize, PoolError> {
        self.pool.total_free_memory()
    }

    fn payload_len(&self, handle: Handle) -> Result<usize, PoolError> {
        self.pool.payload_len(handle)
    }

    fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), PoolError> {
        self.pool.read(handle, offset, buf)
    }

    fn write(&self, handle: Handle, offset: usize, data: &[u8]) -> Result<(), PoolError> {
        self.pool.write(handle, offset, data)
    }
}
