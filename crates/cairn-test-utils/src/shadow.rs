//! Reference model of a pool's live contents.

use indexmap::IndexMap;

use cairn_core::{Handle, HandleAllocator, PoolError};

use crate::pattern_for;
use crate::workload::Op;

/// Tracks what every live allocation should contain.
///
/// Each successful allocation is filled with [`pattern_for`] and recorded
/// here; [`verify`](ShadowPool::verify) then reads every payload back
/// through the allocator and compares. Insertion order is kept so that
/// slot-indexed frees are reproducible for a given seed.
#[derive(Debug, Default)]
pub struct ShadowPool {
    live: IndexMap<Handle, Vec<u8>>,
}

impl ShadowPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live handles in allocation order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.live.keys().copied()
    }

    /// Allocate `size` bytes, fill them and record the expected contents.
    ///
    /// # Panics
    ///
    /// If the allocator returns a handle that is already live.
    pub fn alloc(
        &mut self,
        pool: &impl HandleAllocator,
        size: usize,
    ) -> Result<Handle, PoolError> {
        let handle = pool.alloc(size)?;
        assert!(
            !self.live.contains_key(&handle),
            "allocator issued live handle {handle} twice"
        );
        let data = pattern_for(handle, size);
        pool.write(handle, 0, &data)?;
        self.live.insert(handle, data);
        Ok(handle)
    }

    /// Free a tracked handle.
    pub fn free(&mut self, pool: &impl HandleAllocator, handle: Handle) -> Result<(), PoolError> {
        pool.free(handle)?;
        self.live.shift_remove(&handle);
        Ok(())
    }

    /// Free the live handle at `slot % len`. Returns `None` when nothing
    /// is live.
    pub fn free_slot(
        &mut self,
        pool: &impl HandleAllocator,
        slot: usize,
    ) -> Option<Result<Handle, PoolError>> {
        if self.live.is_empty() {
            return None;
        }
        let (&handle, _) = self.live.get_index(slot % self.live.len())?;
        Some(self.free(pool, handle).map(|()| handle))
    }

    /// Apply one workload step.
    ///
    /// Capacity failures (`AllocationFailed`, `HandleTableFull`) are part
    /// of normal operation and are swallowed; any other error is
    /// returned.
    pub fn apply(&mut self, pool: &impl HandleAllocator, op: Op) -> Result<(), PoolError> {
        match op {
            Op::Alloc { size } => match self.alloc(pool, size) {
                Ok(_)
                | Err(PoolError::AllocationFailed { .. })
                | Err(PoolError::HandleTableFull { .. }) => Ok(()),
                Err(e) => Err(e),
            },
            Op::Free { slot } => self.free_slot(pool, slot).transpose().map(|_| ()),
            Op::Defragment => pool.defragment().map(|_| ()),
        }
    }

    /// Read every live payload back and compare with the model.
    ///
    /// # Panics
    ///
    /// On the first payload whose contents or capacity disagree.
    pub fn verify(&self, pool: &impl HandleAllocator) -> Result<(), PoolError> {
        let mut buf = Vec::new();
        for (&handle, expected) in &self.live {
            let capacity = pool.payload_len(handle)?;
            assert!(
                capacity >= expected.len(),
                "handle {handle}: capacity {capacity} < requested {}",
                expected.len()
            );
            buf.resize(expected.len(), 0);
            pool.read(handle, 0, &mut buf)?;
            assert!(buf == *expected, "handle {handle}: payload corrupted");
        }
        Ok(())
    }
}
