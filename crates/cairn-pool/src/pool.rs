//! Thread-safe handle pool.
//!
//! [`HandlePool`] wraps a [`BlockArena`] in a [`Mutex`]. Every public
//! operation takes the lock for its whole duration, so operations are
//! linearizable. Payload borrows are only handed out under the lock,
//! either inside a closure ([`HandlePool::with_payload`]) or through a
//! [`PoolGuard`] held by the caller.

use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard};

use cairn_core::{BlockInfo, DefragReport, Handle, HandleAllocator, PoolError, PoolStats};

use crate::arena::BlockArena;
use crate::config::{PoolConfig, PoolLayout};

/// A fixed-size arena shared between threads, addressed by [`Handle`]s.
///
/// # Examples
///
/// ```
/// use cairn_pool::{HandlePool, PoolConfig};
///
/// let pool = HandlePool::new(PoolConfig::new(4096)).unwrap();
/// let h = pool.alloc(100).unwrap();
/// pool.write(h, 0, b"hello").unwrap();
/// pool.defragment().unwrap();
/// let mut buf = [0u8; 5];
/// pool.read(h, 0, &mut buf).unwrap();
/// assert_eq!(&buf, b"hello");
/// pool.free(h).unwrap();
/// ```
pub struct HandlePool {
    layout: PoolLayout,
    inner: Mutex<BlockArena>,
}

// Compile-time assertion: HandlePool must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<HandlePool>();
};

impl HandlePool {
    /// Validate `config` and create a pool whose arena is one free block.
    ///
    /// # Errors
    ///
    /// Returns the configuration error from [`PoolConfig::validate`].
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        Ok(Self::from_arena(BlockArena::new(config)?))
    }

    /// Share an existing arena.
    pub fn from_arena(arena: BlockArena) -> Self {
        Self {
            layout: *arena.layout(),
            inner: Mutex::new(arena),
        }
    }

    /// Take the arena back out of the pool.
    pub fn into_inner(self) -> Result<BlockArena, PoolError> {
        self.inner.into_inner().map_err(|_| poisoned())
    }

    /// Lock the pool for a sequence of operations.
    ///
    /// The guard dereferences to [`BlockArena`]; payload slices borrowed
    /// from it cannot outlive the lock.
    pub fn lock(&self) -> Result<PoolGuard<'_>, PoolError> {
        self.inner
            .lock()
            .map(|arena| PoolGuard { arena })
            .map_err(|_| poisoned())
    }

    /// The validated geometry of this pool.
    pub fn layout(&self) -> PoolLayout {
        self.layout
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
        self.layout.max_handles
    }

    /// See [`BlockArena::alloc`].
    pub fn alloc(&self, size: usize) -> Result<Handle, PoolError> {
        self.lock()?.alloc(size)
    }

    /// See [`BlockArena::free`].
    pub fn free(&self, handle: Handle) -> Result<(), PoolError> {
        self.lock()?.free(handle)
    }

    /// See [`BlockArena::defragment`].
    pub fn defragment(&self) -> Result<DefragReport, PoolError> {
        self.lock()?.defragment()
    }

    /// Raw payload address of a live handle.
    ///
    /// The address is stable until the handle is freed or the pool is
    /// defragmented, but nothing stops another thread doing either.
    /// Callers sharing the pool should use [`with_payload`](Self::with_payload)
    /// or [`lock`](Self::lock) instead.
    pub fn get_pointer(&self, handle: Handle) -> Result<Option<NonNull<u8>>, PoolError> {
        Ok(self.lock()?.get_pointer(handle))
    }

    /// Run `f` on a live allocation's payload while holding the lock.
    ///
    /// A panic in `f` is resumed after the lock is released, so it does
    /// not poison the pool.
    pub fn with_payload<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, PoolError> {
        let arena = self.lock()?;
        let payload = arena
            .payload(handle)
            .ok_or(PoolError::InvalidHandle { handle })?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || f(payload)));
        drop(arena);
        match outcome {
            Ok(value) => Ok(value),
            Err(cause) => panic::resume_unwind(cause),
        }
    }

    /// Run `f` on a live allocation's mutable payload while holding the
    /// lock.
    ///
    /// `f` only sees payload bytes, never block headers, so a panic in it
    /// leaves the arena consistent: the panic is resumed after the lock is
    /// released and the pool stays usable.
    pub fn with_payload_mut<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, PoolError> {
        let mut arena = self.lock()?;
        let payload = arena
            .payload_mut(handle)
            .ok_or(PoolError::InvalidHandle { handle })?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || f(payload)));
        drop(arena);
        match outcome {
            Ok(value) => Ok(value),
            Err(cause) => panic::resume_unwind(cause),
        }
    }

    /// See [`BlockArena::read`].
    pub fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), PoolError> {
        self.lock()?.read(handle, offset, buf)
    }

    /// See [`BlockArena::write`].
    pub fn write(&self, handle: Handle, offset: usize, data: &[u8]) -> Result<(), PoolError> {
        self.lock()?.write(handle, offset, data)
    }

    /// See [`BlockArena::payload_len`].
    pub fn payload_len(&self, handle: Handle) -> Result<usize, PoolError> {
        self.lock()?.payload_len(handle)
    }

    /// See [`BlockArena::max_allocatable_size`].
    pub fn max_allocatable_size(&self) -> Result<usize, PoolError> {
        Ok(self.lock()?.max_allocatable_size())
    }

    /// See [`BlockArena::total_free_memory`].
    pub fn total_free_memory(&self) -> Result<usize, PoolError> {
        Ok(self.lock()?.total_free_memory())
    }

    /// Number of live allocations.
    pub fn handles_in_use(&self) -> Result<usize, PoolError> {
        Ok(self.lock()?.handles_in_use())
    }

    /// See [`BlockArena::stats`].
    pub fn stats(&self) -> Result<PoolStats, PoolError> {
        Ok(self.lock()?.stats())
    }

    /// Snapshot of every block in address order.
    pub fn blocks(&self) -> Result<Vec<BlockInfo>, PoolError> {
        Ok(self.lock()?.blocks().collect())
    }

    /// See [`BlockArena::check_invariants`].
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        self.lock()?.check_invariants()
    }
}

impl HandleAllocator for HandlePool {
    fn alloc(&self, size: usize) -> Result<Handle, PoolError> {
        HandlePool::alloc(self, size)
    }

    fn free(&self, handle: Handle) -> Result<(), PoolError> {
        HandlePool::free(self, handle)
    }

    fn defragment(&self) -> Result<DefragReport, PoolError> {
        HandlePool::defragment(self)
    }

    fn max_allocatable_size(&self) -> Result<usize, PoolError> {
        HandlePool::max_allocatable_size(self)
    }

    fn total_free_memory(&self) -> Result<usize, PoolError> {
        HandlePool::total_free_memory(self)
    }

    fn payload_len(&self, handle: Handle) -> Result<usize, PoolError> {
        HandlePool::payload_len(self, handle)
    }

    fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), PoolError> {
        HandlePool::read(self, handle, offset, buf)
    }

    fn write(&self, handle: Handle, offset: usize, data: &[u8]) -> Result<(), PoolError> {
        HandlePool::write(self, handle, offset, data)
    }
}

impl std::fmt::Debug for HandlePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlePool")
            .field("pool_size", &self.layout.pool_size)
            .field("max_handles", &self.layout.max_handles)
            .field("alignment", &self.layout.alignment)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a pool's arena.
///
/// Obtained from [`HandlePool::lock`]. Dropping the guard releases the
/// lock.
pub struct PoolGuard<'a> {
    arena: MutexGuard<'a, BlockArena>,
}

impl Deref for PoolGuard<'_> {
    type Target = BlockArena;

    fn deref(&self) -> &BlockArena {
        &self.arena
    }
}

impl DerefMut for PoolGuard<'_> {
    fn deref_mut(&mut self) -> &mut BlockArena {
        &mut self.arena
    }
}

fn poisoned() -> PoolError {
    PoolError::Internal {
        reason: "pool mutex poisoned".into(),
    }
}
