//! Error types for the Cairn memory pool.
//!
//! The taxonomy is closed: every failure a pool can report maps onto
//! exactly one [`PoolStatus`](crate::PoolStatus) code. Errors are
//! returned by value and never leave the pool in a modified state.

use std::error::Error;
use std::fmt;

use crate::id::Handle;

/// Errors returned by pool operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The handle is out of range or does not refer to a live allocation.
    InvalidHandle {
        /// The rejected handle.
        handle: Handle,
    },
    /// The requested size is zero or can never fit in the arena, or a
    /// payload access spans past the end of the allocation.
    InvalidSize {
        /// Number of bytes requested.
        requested: usize,
        /// The bound the request violated.
        limit: usize,
    },
    /// No free block is large enough for the request.
    ///
    /// Defragmenting may make room if total free memory suffices.
    AllocationFailed {
        /// Number of bytes requested, after alignment rounding.
        requested: usize,
        /// Largest currently allocatable size.
        largest_free: usize,
    },
    /// The handle's slot refers to a block that is already free.
    DoubleFreeAttempt {
        /// The handle that was freed twice.
        handle: Handle,
    },
    /// The handle table cannot be addressed with a `u32` handle.
    HandleOverflow {
        /// Requested number of handles.
        requested: usize,
        /// Largest supported number of handles.
        limit: usize,
    },
    /// Arena space was available but every handle is in use.
    HandleTableFull {
        /// Total number of handles in the table.
        capacity: usize,
    },
    /// The configured alignment is not a supported power of two.
    AlignmentError {
        /// The rejected alignment.
        alignment: usize,
    },
    /// Internal failure: a poisoned lock or a broken pool invariant.
    Internal {
        /// Human-readable description.
        reason: String,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle { handle } => write!(f, "invalid handle {handle}"),
            Self::InvalidSize { requested, limit } => {
                write!(f, "invalid size: requested {requested} bytes, limit {limit} bytes")
            }
            Self::AllocationFailed {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "allocation failed: requested {requested} bytes, largest free {largest_free} bytes"
                )
            }
            Self::DoubleFreeAttempt { handle } => {
                write!(f, "double free of handle {handle}")
            }
            Self::HandleOverflow { requested, limit } => {
                write!(f, "handle overflow: {requested} handles requested, limit {limit}")
            }
            Self::HandleTableFull { capacity } => {
                write!(f, "handle table full ({capacity} handles in use)")
            }
            Self::AlignmentError { alignment } => {
                write!(f, "unsupported alignment {alignment}")
            }
            Self::Internal { reason } => write!(f, "internal pool error: {reason}"),
        }
    }
}

impl Error for PoolError {}
