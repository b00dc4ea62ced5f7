//! The allocator abstraction shared by pool implementations and test
//! tooling.

use crate::error::PoolError;
use crate::id::Handle;
use crate::stats::DefragReport;

/// A thread-safe, handle-indirected allocator over a fixed arena.
///
/// All methods take `&self`: implementations serialise access
/// internally. Callers never hold raw addresses; payload bytes are
/// reached through [`read`](HandleAllocator::read) and
/// [`write`](HandleAllocator::write), which re-resolve the handle on
/// every call and therefore stay correct across
/// [`defragment`](HandleAllocator::defragment).
pub trait HandleAllocator {
    /// Allocate at least `size` payload bytes.
    fn alloc(&self, size: usize) -> Result<Handle, PoolError>;

    /// Release an allocation and coalesce it with free neighbours.
    fn free(&self, handle: Handle) -> Result<(), PoolError>;

    /// Compact live blocks to the front of the arena.
    fn defragment(&self) -> Result<DefragReport, PoolError>;

    /// Largest request satisfiable without defragmenting.
    fn max_allocatable_size(&self) -> Result<usize, PoolError>;

    /// Sum of all free block payload sizes.
    fn total_free_memory(&self) -> Result<usize, PoolError>;

    /// Usable payload capacity of a live allocation.
    fn payload_len(&self, handle: Handle) -> Result<usize, PoolError>;

    /// Copy `buf.len()` payload bytes starting at `offset` into `buf`.
    fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<(), PoolError>;

    /// Copy `data` into the payload starting at `offset`.
    fn write(&self, handle: Handle, offset: usize, data: &[u8]) -> Result<(), PoolError>;
}
