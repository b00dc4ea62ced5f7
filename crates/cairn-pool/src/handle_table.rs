//! Fixed-capacity handle table with a free-handle stack.
//!
//! The table maps each [`Handle`] to the arena offset of the block that
//! currently owns it. Unused handle values sit on a LIFO stack; freeing
//! an allocation pushes its value back so the next allocation reuses it.

use cairn_core::Handle;

/// Handle → block offset mapping.
pub(crate) struct HandleTable {
    /// `slots[h]` is the offset of the block owned by handle `h`.
    slots: Box<[Option<usize>]>,
    /// Unused handle values. The top of the stack is issued next.
    free: Vec<Handle>,
}

impl HandleTable {
    /// Create a table with `capacity` unbound handles.
    ///
    /// Handles are issued in ascending order on a fresh table.
    /// `capacity` must fit in a `u32` (checked by config validation).
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            free: (0..capacity).rev().map(|i| Handle(i as u32)).collect(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of handles currently bound.
    pub(crate) fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Pop a handle and bind it to `offset`, or `None` if every handle
    /// is bound (the table is left unchanged).
    pub(crate) fn acquire(&mut self, offset: usize) -> Option<Handle> {
        let handle = self.free.pop()?;
        self.slots[handle.index()] = Some(offset);
        Some(handle)
    }

    /// Offset of the block bound to `handle`, if any.
    pub(crate) fn resolve(&self, handle: Handle) -> Option<usize> {
        self.slots.get(handle.index()).copied().flatten()
    }

    /// Point a bound handle at a relocated block.
    pub(crate) fn rebind(&mut self, handle: Handle, offset: usize) {
        self.slots[handle.index()] = Some(offset);
    }

    /// Unbind `handle` and return it to the free stack.
    ///
    /// Callers must have checked that the handle is bound.
    pub(crate) fn release(&mut self, handle: Handle) {
        debug_assert!(self.slots[handle.index()].is_some());
        self.slots[handle.index()] = None;
        self.free.push(handle);
    }

    /// Iterate over bound handles and their block offsets.
    pub(crate) fn bound(&self) -> impl Iterator<Item = (Handle, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|off| (Handle(i as u32), off)))
    }
}
