//! Backend capability trait.
//!
//! A backend knows how to fetch bytes and how to produce directory listings.
//! The [`Filesystem`](crate::Filesystem) owns the caches and hands the
//! directory cache to the backend, because how listings get resolved (one
//! call per directory, or incremental resolution from a flat tree) is the
//! backend's business.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

use crate::cache::DirCache;
use crate::error::FsResult;
use crate::types::Stat;

/// Read-only storage capability behind a [`Filesystem`](crate::Filesystem).
///
/// Paths are normalized and relative to the filesystem root.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Per-entry metadata this backend attaches to every [`Stat`].
    type Meta: Clone + Send + Sync + 'static;

    /// Fetch the full contents of a file.
    ///
    /// Called at most once per path; the filesystem caches the outcome.
    async fn fetch_file(&self, path: &str) -> FsResult<Vec<u8>>;

    /// Resolve the immediate children of `path` through `dirs`.
    ///
    /// Implementations must go through the cache so repeated and concurrent
    /// reads of the same directory cost one fetch. Most backends just wrap
    /// their listing call in [`cached_listing`].
    fn read_dir(
        self: Arc<Self>,
        path: String,
        dirs: DirCache<Self::Meta>,
    ) -> BoxFuture<'static, FsResult<Vec<Stat<Self::Meta>>>>;
}

/// Single-flight `fetch` under the exact directory path.
pub fn cached_listing<M, F, Fut>(
    dirs: &DirCache<M>,
    path: String,
    fetch: F,
) -> BoxFuture<'static, FsResult<Vec<Stat<M>>>>
where
    M: Clone + Send + Sync + 'static,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = FsResult<Vec<Stat<M>>>> + Send + 'static,
{
    let key = path.clone();
    dirs.get_or_create(&key, move || fetch(path)).boxed()
}
