//! Pool configuration parameters and the layout derived from them.

use cairn_core::PoolError;

/// Maximum fundamental alignment honoured by the arena.
///
/// Every payload address is a multiple of the configured alignment,
/// which may not exceed this value (the backing storage is aligned to it).
pub const MAX_ALIGN: usize = 16;

/// Encoded size of a block header before alignment padding:
/// five little-endian `u64` fields (size, flags, next, prev, handle).
pub(crate) const RAW_HEADER_BYTES: usize = 40;

/// Configuration for a handle pool.
///
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Arena capacity in bytes, headers included.
    ///
    /// Must exceed one header plus one minimal block.
    pub pool_size: usize,

    /// Number of handle slots, i.e. the maximum number of live allocations.
    ///
    /// Default: 1024. Must be at least 1 and fit in a `u32`.
    pub max_handles: usize,

    /// Payload alignment in bytes.
    ///
    /// Default: [`MAX_ALIGN`]. Must be a power of two no larger than
    /// [`MAX_ALIGN`]. Request sizes are rounded up to this value.
    pub alignment: usize,
}

impl PoolConfig {
    /// Default handle table capacity.
    pub const DEFAULT_MAX_HANDLES: usize = 1024;

    /// Default payload alignment.
    pub const DEFAULT_ALIGNMENT: usize = MAX_ALIGN;

    /// Create a config for an arena of `pool_size` bytes with default
    /// handle capacity and alignment.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            max_handles: Self::DEFAULT_MAX_HANDLES,
            alignment: Self::DEFAULT_ALIGNMENT,
        }
    }

    /// Set the handle table capacity.
    pub fn with_max_handles(mut self, max_handles: usize) -> Self {
        self.max_handles = max_handles;
        self
    }

    /// Set the payload alignment.
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Check the parameters and compute the derived layout.
    ///
    /// Alignment is checked first, then the handle count, then the pool
    /// size (whose minimum depends on the alignment).
    pub fn validate(&self) -> Result<PoolLayout, PoolError> {
        if !self.alignment.is_power_of_two() || self.alignment > MAX_ALIGN {
            return Err(PoolError::AlignmentError {
                alignment: self.alignment,
            });
        }
        if self.max_handles == 0 {
            return Err(PoolError::HandleTableFull { capacity: 0 });
        }
        if self.max_handles > u32::MAX as usize {
            return Err(PoolError::HandleOverflow {
                requested: self.max_handles,
                limit: u32::MAX as usize,
            });
        }
        let minimum = PoolLayout::min_pool_size(self.alignment);
        if self.pool_size < minimum {
            return Err(PoolError::InvalidSize {
                requested: self.pool_size,
                limit: minimum,
            });
        }
        let header_size = PoolLayout::header_size_for(self.alignment);
        Ok(PoolLayout {
            pool_size: self.pool_size,
            max_handles: self.max_handles,
            alignment: self.alignment,
            header_size,
            minimal_block_size: header_size + self.alignment,
        })
    }
}

/// Validated pool geometry.
///
/// Produced by [`PoolConfig::validate`]; the allocator only ever sees a
/// layout whose invariants have been checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolLayout {
    /// Arena capacity in bytes.
    pub pool_size: usize,
    /// Handle table capacity.
    pub max_handles: usize,
    /// Payload alignment (power of two).
    pub alignment: usize,
    /// Header stride: the raw header rounded up to `alignment`.
    pub header_size: usize,
    /// Smallest split remainder worth keeping as its own free block.
    pub minimal_block_size: usize,
}

impl PoolLayout {
    /// Header stride for the given alignment.
    pub const fn header_size_for(alignment: usize) -> usize {
        (RAW_HEADER_BYTES + alignment - 1) & !(alignment - 1)
    }

    /// Smallest valid `pool_size` for the given alignment: one header
    /// plus one minimal block, plus one byte.
    pub const fn min_pool_size(alignment: usize) -> usize {
        let header = Self::header_size_for(alignment);
        2 * header + alignment + 1
    }

    /// Layout at [`MAX_ALIGN`] for parameters already checked at
    /// compile time.
    pub(crate) const fn at_max_align(pool_size: usize, max_handles: usize) -> Self {
        let header_size = Self::header_size_for(MAX_ALIGN);
        Self {
            pool_size,
            max_handles,
            alignment: MAX_ALIGN,
            header_size,
            minimal_block_size: header_size + MAX_ALIGN,
        }
    }

    /// Round `n` up to the alignment, or `None` on overflow.
    #[inline]
    pub fn align_up(&self, n: usize) -> Option<usize> {
        n.checked_add(self.alignment - 1)
            .map(|v| v & !(self.alignment - 1))
    }

    /// Round `n` down to the alignment.
    #[inline]
    pub fn align_down(&self, n: usize) -> usize {
        n & !(self.alignment - 1)
    }

    /// Largest request size accepted by `alloc`, before rounding.
    #[inline]
    pub fn max_request(&self) -> usize {
        self.pool_size - self.header_size
    }
}
