//! Core types and traits for the Cairn memory pool.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the allocator and its consumers: the opaque
//! [`Handle`] type, the closed error taxonomy, ABI-stable result codes,
//! report types, and the [`HandleAllocator`] trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod stats;
pub mod status;
pub mod traits;

pub use error::PoolError;
pub use id::Handle;
pub use stats::{BlockInfo, DefragReport, PoolStats};
pub use status::PoolStatus;
pub use traits::HandleAllocator;
