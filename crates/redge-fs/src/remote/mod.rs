//! Filesystem over a remote tree store.
//!
//! - [`TreeSource`] - what the store must offer (ref resolution, flat
//!   subtree listing, byte fetch), addressed by node id
//! - [`RemoteTreeBackend`] - rebuilds path-based listings from node ids
//! - [`MemoryTreeSource`] - in-memory store for snapshots and tests

mod backend;
mod memory_source;
mod source;

pub use backend::{RemoteMeta, RemoteTreeBackend};
pub use memory_source::{MemoryTreeSource, SourceCalls};
pub use source::{NodeId, NodeKind, TreeNode, TreeSource};
