//! ABI-stable result codes.
//!
//! [`PoolStatus`] is a `repr(i32)` enum with one value per error class
//! plus `Success`. It is the form in which pool results cross a C
//! boundary or get logged as a single integer.

use crate::error::PoolError;

/// Result code for a pool operation.
///
/// `Success` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolStatus {
    /// The operation succeeded.
    Success = 0,
    /// Handle is out of range or not allocated.
    InvalidHandle = -1,
    /// Size is zero, too large, or outside the allocation.
    InvalidSize = -2,
    /// No free block is large enough.
    AllocationFailed = -3,
    /// Handle refers to a block that is already free.
    DoubleFreeAttempt = -4,
    /// Handle count exceeds the representable range.
    HandleOverflow = -5,
    /// No handle slot is available.
    HandleTableFull = -6,
    /// Unsupported alignment.
    AlignmentError = -7,
    /// Internal error (poisoned lock, broken invariant).
    UnknownError = -8,
}

impl PoolStatus {
    /// Status code for a result, discarding the success value.
    pub fn from_result<T>(result: &Result<T, PoolError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => Self::from(e),
        }
    }

    /// Whether this code reports success.
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<&PoolError> for PoolStatus {
    fn from(e: &PoolError) -> Self {
        match e {
            PoolError::InvalidHandle { .. } => Self::InvalidHandle,
            PoolError::InvalidSize { .. } => Self::InvalidSize,
            PoolError::AllocationFailed { .. } => Self::AllocationFailed,
            PoolError::DoubleFreeAttempt { .. } => Self::DoubleFreeAttempt,
            PoolError::HandleOverflow { .. } => Self::HandleOverflow,
            PoolError::HandleTableFull { .. } => Self::HandleTableFull,
            PoolError::AlignmentError { .. } => Self::AlignmentError,
            PoolError::Internal { .. } => Self::UnknownError,
        }
    }
}
