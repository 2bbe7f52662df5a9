//! In-memory backend.
//!
//! Used for fixtures and tests. Contents are populated up front with
//! [`MemoryBackend::insert_file`] and [`MemoryBackend::insert_dir`]; the
//! filesystem on top only ever reads.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cache::DirCache;
use crate::error::{FsError, FsResult};
use crate::ops::{Backend, cached_listing};
use crate::path;
use crate::types::{FileType, Stat};

/// Metadata for in-memory entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMeta {
    /// Size in bytes (0 for directories).
    pub size: u64,
}

#[derive(Debug, Clone)]
enum Entry {
    File(Vec<u8>),
    Directory,
}

/// In-memory backend.
///
/// Thread-safe via an internal `RwLock`.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty tree (just the root directory).
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(String::new(), Entry::Directory);
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Build a tree from `(path, contents)` pairs.
    pub fn from_files<P, D>(files: impl IntoIterator<Item = (P, D)>) -> Self
    where
        P: AsRef<str>,
        D: Into<Vec<u8>>,
    {
        let backend = Self::new();
        for (path, data) in files {
            backend.insert_file(path.as_ref(), data);
        }
        backend
    }

    /// Add (or replace) a file, creating missing parent directories.
    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        let path = path::normalize(path);
        let mut entries = self.entries.write();
        Self::ensure_parents(&mut entries, &path);
        entries.insert(path, Entry::File(data.into()));
    }

    /// Add a directory, creating missing parent directories.
    pub fn insert_dir(&self, path: &str) {
        let path = path::normalize(path);
        let mut entries = self.entries.write();
        Self::ensure_parents(&mut entries, &path);
        entries.entry(path).or_insert(Entry::Directory);
    }

    fn ensure_parents(entries: &mut HashMap<String, Entry>, path: &str) {
        let mut current = path::parent(path);
        while let Some(dir) = current {
            entries.entry(dir.to_string()).or_insert(Entry::Directory);
            current = path::parent(dir);
        }
    }

    fn list(&self, dir: &str) -> FsResult<Vec<Stat<MemoryMeta>>> {
        let entries = self.entries.read();
        match entries.get(dir) {
            Some(Entry::Directory) => {}
            Some(Entry::File(_)) => return Err(FsError::not_a_directory(dir)),
            None => return Err(FsError::not_found(dir)),
        }

        let mut result: Vec<_> = entries
            .iter()
            .filter(|(entry_path, _)| {
                !entry_path.is_empty() && path::parent(entry_path) == Some(dir)
            })
            .map(|(entry_path, entry)| {
                let (kind, size) = match entry {
                    Entry::File(data) => (FileType::File, data.len() as u64),
                    Entry::Directory => (FileType::Directory, 0),
                };
                Stat::new(
                    path::file_name(entry_path),
                    entry_path.clone(),
                    kind,
                    MemoryMeta { size },
                )
            })
            .collect();

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    type Meta = MemoryMeta;

    async fn fetch_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let entries = self.entries.read();
        match entries.get(path) {
            Some(Entry::File(data)) => Ok(data.clone()),
            Some(Entry::Directory) => Err(FsError::is_a_directory(path)),
            None => Err(FsError::not_found(path)),
        }
    }

    fn read_dir(
        self: Arc<Self>,
        path: String,
        dirs: DirCache<MemoryMeta>,
    ) -> BoxFuture<'static, FsResult<Vec<Stat<MemoryMeta>>>> {
        cached_listing(&dirs, path, move |dir| async move { self.list(&dir) })
    }
}
