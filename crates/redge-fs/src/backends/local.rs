//! Local filesystem backend.
//!
//! Serves a directory on disk, with path security to prevent escaping the
//! root directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::cache::DirCache;
use crate::error::{FsError, FsResult};
use crate::ops::{Backend, cached_listing};
use crate::path;
use crate::types::{FileType, Stat};

/// Metadata for entries on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalMeta {
    /// Size in bytes.
    pub size: u64,
    /// Unix permission bits, where the platform has them.
    pub perm: Option<u32>,
    /// Last modification time.
    pub modified: Option<SystemTime>,
}

impl LocalMeta {
    fn from_metadata(meta: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        let perm = {
            use std::os::unix::fs::PermissionsExt;
            Some(meta.permissions().mode())
        };
        #[cfg(not(unix))]
        let perm = None;

        Self {
            size: meta.len(),
            perm,
            modified: meta.modified().ok(),
        }
    }
}

/// Local filesystem backend.
///
/// All paths are relative to `root`. For example, if `root` is
/// `/srv/site`, then `fetch_file("src/main.rs")` reads
/// `/srv/site/src/main.rs`. Symlinks that lead outside the root are refused.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at the given directory.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a normalized relative path to a location on disk.
    ///
    /// Returns an error if the resolved location is outside the root.
    async fn resolve(&self, rel: &str) -> FsResult<PathBuf> {
        let full = if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        };

        let canonical = match fs::canonicalize(&full).await {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FsError::not_found(rel));
            }
            Err(e) => return Err(e.into()),
        };

        if !canonical.starts_with(&self.root) {
            return Err(FsError::path_escapes_root(format!(
                "{} is not under {}",
                canonical.display(),
                self.root.display()
            )));
        }
        Ok(canonical)
    }

    async fn list(&self, dir: &str) -> FsResult<Vec<Stat<LocalMeta>>> {
        let full = self.resolve(dir).await?;
        let mut reader = match fs::read_dir(&full).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => {
                return Err(FsError::not_a_directory(dir));
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follow symlinks; dangling ones are skipped.
            let Ok(meta) = fs::metadata(entry.path()).await else {
                tracing::debug!(name = %name, dir, "skipping unreadable entry");
                continue;
            };
            let kind = if meta.is_dir() {
                FileType::Directory
            } else {
                FileType::File
            };
            entries.push(Stat::new(
                name.clone(),
                path::join(dir, &name),
                kind,
                LocalMeta::from_metadata(&meta),
            ));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[async_trait]
impl Backend for LocalBackend {
    type Meta = LocalMeta;

    async fn fetch_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let full = self.resolve(path).await?;
        if fs::metadata(&full).await?.is_dir() {
            return Err(FsError::is_a_directory(path));
        }
        Ok(fs::read(&full).await?)
    }

    fn read_dir(
        self: Arc<Self>,
        path: String,
        dirs: DirCache<LocalMeta>,
    ) -> BoxFuture<'static, FsResult<Vec<Stat<LocalMeta>>>> {
        cached_listing(&dirs, path, move |dir| async move { self.list(&dir).await })
    }
}
