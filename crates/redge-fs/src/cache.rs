//! Single-flight read cache.
//!
//! Maps a key to one shared, possibly still running, fetch. The first caller
//! for a key starts the fetch; everyone else (concurrent or later) awaits the
//! same computation and sees the same value or the same error. Entries are
//! write-once and live as long as the cache.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::FsResult;
use crate::types::Stat;

/// A shared fetch. Clone it to wait on it from another caller.
///
/// Dropping a waiter never cancels the computation: it stays in the cache
/// and resumes as soon as any other waiter polls it.
pub type PendingRead<T> = Shared<BoxFuture<'static, FsResult<T>>>;

/// Keyed map of in-flight or settled fetches.
pub struct ReadCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    entries: Arc<DashMap<String, PendingRead<T>>>,
}

impl<T> Clone for ReadCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for ReadCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReadCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Return the entry for `key`, creating it with `factory` if absent.
    ///
    /// `factory` runs at most once per key and its future is stored before
    /// it is first polled. It runs under the map's shard lock, so it must only
    /// build the future; the future itself may freely use this cache.
    pub fn get_or_create<F, Fut>(&self, key: &str, factory: F) -> PendingRead<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FsResult<T>> + Send + 'static,
    {
        if let Some(existing) = self.entries.get(key) {
            tracing::trace!(key, "read cache hit");
            return existing.value().clone();
        }

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                tracing::trace!(key, "read cache miss");
                entry.insert(factory().boxed().shared()).value().clone()
            }
        }
    }

    /// Store an already known value unless `key` is present.
    ///
    /// Returns true if the value was inserted.
    pub fn insert_ready(&self, key: impl Into<String>, value: T) -> bool {
        match self.entries.entry(key.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(futures::future::ready(Ok(value)).boxed().shared());
                true
            }
        }
    }

    /// Get the entry for `key` without creating it.
    pub fn get(&self, key: &str) -> Option<PendingRead<T>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns true if `key` has an entry (settled or not).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry was ever created.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache of directory listings.
pub type DirCache<M> = ReadCache<Vec<Stat<M>>>;

/// The three cache namespaces owned by one filesystem instance.
///
/// A path can be asked for its listing, its bytes and its existence at the
/// same time, so each question gets its own map.
pub struct FsCache<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Directory listings.
    pub dirs: DirCache<M>,
    /// Raw file contents.
    pub files: ReadCache<Vec<u8>>,
    /// Existence checks.
    pub exists: ReadCache<bool>,
}

impl<M> FsCache<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Create empty caches.
    pub fn new() -> Self {
        Self {
            dirs: ReadCache::new(),
            files: ReadCache::new(),
            exists: ReadCache::new(),
        }
    }
}

impl<M> Default for FsCache<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for FsCache<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            dirs: self.dirs.clone(),
            files: self.files.clone(),
            exists: self.exists.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_factory_runs_once_per_key() {
        let cache: ReadCache<u32> = ReadCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let value = cache
                .get_or_create("answer", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache: ReadCache<String> = ReadCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_create("slow", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("done".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "done");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_replayed() {
        let cache: ReadCache<u32> = ReadCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let err = cache
                .get_or_create("broken", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(FsError::backend("connection reset"))
                })
                .await
                .unwrap_err();
            assert!(matches!(err, FsError::Backend(ref msg) if msg == "connection reset"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_cancel_fetch() {
        let cache: ReadCache<u32> = ReadCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let factory_calls = Arc::clone(&calls);
        let pending = cache.get_or_create("k", move || async move {
            factory_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(7)
        });

        // Give up almost immediately.
        let abandoned = tokio::time::timeout(Duration::from_millis(1), pending).await;
        assert!(abandoned.is_err());

        let value = cache
            .get_or_create("k", || async { Ok(0) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_insert_ready_never_overwrites() {
        let cache: ReadCache<u32> = ReadCache::new();
        assert!(cache.insert_ready("k", 1));
        assert!(!cache.insert_ready("k", 2));
        assert_eq!(cache.get("k").unwrap().await.unwrap(), 1);
        assert!(cache.contains("k"));
        assert!(cache.get("missing").is_none());
    }
}
