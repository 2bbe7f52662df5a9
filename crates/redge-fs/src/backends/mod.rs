//! Local and in-memory backends.
//!
//! Both implement [`Backend`](crate::Backend) with one listing call per
//! directory. The remote tree backend lives in [`crate::remote`].

mod local;
mod memory;

pub use local::{LocalBackend, LocalMeta};
pub use memory::{MemoryBackend, MemoryMeta};
