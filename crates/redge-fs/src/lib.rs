//! # redge-fs
//!
//! Read-only virtual filesystem with a uniform `read_dir` / `read_file`
//! interface over different stores:
//!
//! - [`Filesystem`] - the public front; owns the read caches
//! - [`Backend`] - what a store must provide
//! - [`MemoryBackend`], [`LocalBackend`] - one listing call per directory
//! - [`RemoteTreeBackend`] - a tree store addressed by node id, where
//!   per-directory listings are rebuilt from flat subtree responses
//!
//! ## Caching
//!
//! Every read goes through a single-flight cache: the first caller for a
//! path starts the fetch, concurrent and later callers share its outcome,
//! errors included. Nothing is evicted; caches live as long as the
//! filesystem instance.
//!
//! ```no_run
//! # async fn demo() -> redge_fs::FsResult<()> {
//! use redge_fs::{Filesystem, MemoryTreeSource, RemoteTreeBackend, RemoteTreeConfig};
//!
//! let source = MemoryTreeSource::from_files("main", [("docs/intro.md", "# hi")]);
//! let config = RemoteTreeConfig::new("main").with_token("token");
//! let fs = Filesystem::new(RemoteTreeBackend::new(source, &config)?);
//!
//! for entry in fs.read_dir("docs").await? {
//!     println!("{} ({:?})", entry.path, entry.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod cache;
pub mod config;
mod error;
mod filesystem;
mod ops;
pub mod path;
pub mod remote;
mod types;

pub use backends::{LocalBackend, LocalMeta, MemoryBackend, MemoryMeta};
pub use cache::{DirCache, FsCache, PendingRead, ReadCache};
pub use config::{Credential, RemoteTreeConfig};
pub use error::{ErrorKind, FsError, FsResult};
pub use filesystem::Filesystem;
pub use ops::{Backend, cached_listing};
pub use remote::{
    MemoryTreeSource, NodeId, NodeKind, RemoteMeta, RemoteTreeBackend, SourceCalls, TreeNode,
    TreeSource,
};
pub use types::{FileType, Stat};

/// Filesystem over a remote tree store.
pub type RemoteTreeFilesystem<S> = Filesystem<RemoteTreeBackend<S>>;
