//! Cairn: a handle-based memory pool for fixed arenas.
//!
//! This is the facade crate that re-exports the public API of the Cairn
//! sub-crates. Adding `cairn` as a single dependency is enough for most
//! users.
//!
//! # Quick start
//!
//! ```rust
//! use cairn::prelude::*;
//!
//! let pool = HandlePool::new(PoolConfig::new(2048)).unwrap();
//! let a = pool.alloc(400).unwrap();
//! let b = pool.alloc(400).unwrap();
//! let c = pool.alloc(400).unwrap();
//! pool.with_payload_mut(c, |bytes| bytes.fill(0xCC)).unwrap();
//!
//! // Free the middle block: 800 bytes no longer fit anywhere.
//! pool.free(b).unwrap();
//! assert!(matches!(pool.alloc(800), Err(PoolError::AllocationFailed { .. })));
//!
//! // Compaction moves `c` down; its handle and contents are unchanged.
//! pool.defragment().unwrap();
//! assert!(pool.with_payload(c, |bytes| bytes.iter().all(|&x| x == 0xCC)).unwrap());
//! let big = pool.alloc(800).unwrap();
//!
//! pool.free(a).unwrap();
//! pool.free(big).unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cairn-core` | `Handle`, `PoolError`, `PoolStatus`, reports, `HandleAllocator` |
//! | [`pool`] | `cairn-pool` | `HandlePool`, `FixedPool`, `BlockArena`, configuration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, errors and the allocator trait (`cairn-core`).
///
/// Contains [`types::Handle`], the closed [`types::PoolError`] taxonomy,
/// its ABI-stable [`types::PoolStatus`] codes, and
/// [`types::HandleAllocator`].
pub use cairn_core as types;

/// The allocator itself (`cairn-pool`).
///
/// [`pool::HandlePool`] for runtime-sized pools shared between threads,
/// [`pool::FixedPool`] for compile-time sized ones, and
/// [`pool::BlockArena`] for single-owner use without locking.
pub use cairn_pool as pool;

/// Common imports for typical Cairn usage.
///
/// ```rust
/// use cairn::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use cairn_core::{DefragReport, Handle, HandleAllocator, PoolStats};

    // Errors
    pub use cairn_core::{PoolError, PoolStatus};

    // Pools
    pub use cairn_pool::{BlockArena, FixedPool, HandlePool, PoolConfig, PoolGuard};
}
