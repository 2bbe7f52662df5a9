//! Read-only filesystem front over a [`Backend`].
//!
//! The filesystem owns the three read caches and routes every public
//! operation through them, so each path is fetched at most once per
//! instance no matter how many callers ask for it.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::cache::FsCache;
use crate::error::{FsError, FsResult};
use crate::ops::Backend;
use crate::path;
use crate::types::Stat;

/// Cached, read-only view of a backend.
///
/// Cloning yields another handle to the same instance (same backend, same
/// caches). Separate instances never share caches.
pub struct Filesystem<B: Backend> {
    backend: Arc<B>,
    cache: FsCache<B::Meta>,
}

impl<B: Backend> Clone for Filesystem<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
        }
    }
}

impl<B: Backend> Filesystem<B> {
    /// Create a filesystem with empty caches.
    pub fn new(backend: B) -> Self {
        Self::with_cache(backend, FsCache::new())
    }

    /// Create a filesystem over an explicit cache object.
    pub fn with_cache(backend: B, cache: FsCache<B::Meta>) -> Self {
        Self {
            backend: Arc::new(backend),
            cache,
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The caches.
    pub fn cache(&self) -> &FsCache<B::Meta> {
        &self.cache
    }

    /// Read the whole file at `path`.
    ///
    /// The first call starts the fetch; every later or concurrent call for
    /// the same path gets the same bytes (or the same error).
    #[tracing::instrument(skip(self), name = "fs.read_file")]
    pub async fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let key = path::normalize(path);
        let backend = Arc::clone(&self.backend);
        let file = key.clone();
        self.cache
            .files
            .get_or_create(&key, move || async move {
                let result = backend.fetch_file(&file).await;
                if let Err(e) = &result {
                    tracing::warn!(path = %file, error = %e, "file fetch failed");
                }
                result
            })
            .await
    }

    /// List the immediate children of the directory at `path`.
    #[tracing::instrument(skip(self), name = "fs.read_dir")]
    pub async fn read_dir(&self, path: &str) -> FsResult<Vec<Stat<B::Meta>>> {
        let key = path::normalize(path);
        Arc::clone(&self.backend)
            .read_dir(key, self.cache.dirs.clone())
            .await
    }

    /// Returns true if something exists at `path`.
    ///
    /// Answered from the parent directory's listing. A missing parent means
    /// `false`; backend failures are returned as errors.
    #[tracing::instrument(skip(self), name = "fs.exists")]
    pub async fn exists(&self, path: &str) -> FsResult<bool> {
        let key = path::normalize(path);
        if key.is_empty() {
            return Ok(true);
        }

        let backend = Arc::clone(&self.backend);
        let dirs = self.cache.dirs.clone();
        let target = key.clone();
        self.cache
            .exists
            .get_or_create(&key, move || async move {
                let parent = path::parent(&target).unwrap_or_default().to_string();
                let name = path::file_name(&target);
                match backend.read_dir(parent, dirs).await {
                    Ok(entries) => Ok(entries.iter().any(|e| e.name == name)),
                    Err(e) if e.is_not_found() || matches!(e, FsError::NotADirectory(_)) => {
                        Ok(false)
                    }
                    Err(e) => Err(e),
                }
            })
            .await
    }

    /// Look up the entry for `path` in its parent's listing.
    pub async fn stat(&self, path: &str) -> FsResult<Stat<B::Meta>> {
        let key = path::normalize(path);
        let Some(parent) = path::parent(&key) else {
            return Err(FsError::invalid_path("the root has no parent listing"));
        };

        let name = path::file_name(&key);
        self.read_dir(parent)
            .await?
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| FsError::not_found(key.clone()))
    }

    /// Read a file and decode it as UTF-8.
    pub async fn read_to_string(&self, path: &str) -> FsResult<String> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|e| FsError::InvalidData {
            path: path::normalize(path),
            reason: e.to_string(),
        })
    }

    /// Read a file and parse it as JSON.
    pub async fn read_json<T: DeserializeOwned>(&self, path: &str) -> FsResult<T> {
        let bytes = self.read_file(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| FsError::Json {
            path: path::normalize(path),
            reason: e.to_string(),
        })
    }

    /// Number of directory listings cached so far (settled or in flight).
    pub fn cached_dirs(&self) -> usize {
        self.cache.dirs.len()
    }

    /// Number of files cached so far (settled or in flight).
    pub fn cached_files(&self) -> usize {
        self.cache.files.len()
    }
}
