//! The opaque [`Handle`] identifier.

use std::fmt;

/// Stable identifier for a live pool allocation.
///
/// A handle is an index into the pool's handle table, in the range
/// `[0, max_handles)`. It stays valid across defragmentation; only the
/// payload address behind it moves. Values are recycled once the
/// allocation is freed, so a handle must not be used after `free`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u32);

impl Handle {
    /// The handle value as a table index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Handle {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
