//! Core filesystem types.

use serde::{Deserialize, Serialize};

/// Entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    #[serde(rename = "dir")]
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// One entry of a directory listing.
///
/// `metadata` carries whatever the backend knows about the entry; the remote
/// tree backend stores the node id there so the entry can be expanded later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat<M = ()> {
    /// Entry name (last path segment).
    pub name: String,
    /// Path relative to the filesystem root.
    pub path: String,
    /// Entry type.
    #[serde(rename = "type")]
    pub kind: FileType,
    /// Backend-specific metadata.
    pub metadata: M,
}

impl<M> Stat<M> {
    /// Create a new entry.
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: FileType, metadata: M) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            metadata,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}
