//! Handle-indirected memory pool over a single fixed arena.
//!
//! Callers receive opaque [`Handle`](cairn_core::Handle)s instead of
//! addresses. Because every access goes through the handle table, the
//! pool can compact live blocks in place and close fragmentation gaps
//! without invalidating any outstanding handle.
//!
//! # Architecture
//!
//! ```text
//! HandlePool (Mutex, Send + Sync)
//! └── BlockArena (single owner, &mut self)
//!     ├── RawArena    zeroed, MAX_ALIGN-aligned bytes
//!     │   └── [header|payload][header|payload]...   address-ordered list
//!     └── HandleTable handle → block offset, LIFO free-handle stack
//! FixedPool<POOL_SIZE, MAX_HANDLES>   compile-time sized HandlePool
//! ```
//!
//! # Allocation policy
//!
//! - **alloc:** first fit in address order; split when the remainder can
//!   hold a header plus a minimal block.
//! - **free:** merge with the next block, then the previous one, if free.
//! - **defragment:** slide live blocks to the start, rebind their handles
//!   and leave at most one trailing free block.
//!
//! Block headers live inside the arena and use byte offsets for links,
//! so the whole crate is safe code.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
mod block;
pub mod config;
mod defrag;
pub mod fixed;
mod handle_table;
pub mod pool;
mod raw;

pub use arena::BlockArena;
pub use config::{PoolConfig, PoolLayout, MAX_ALIGN};
pub use fixed::FixedPool;
pub use pool::{HandlePool, PoolGuard};
