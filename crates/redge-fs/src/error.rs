//! Filesystem error types.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Coarse classification of an [`FsError`].
///
/// `NotFound` is a legitimate negative answer. `Resolution` and `Backend`
/// mean something is broken (a traversal defect or an outage) and should
/// not be treated as "the path does not exist".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path, directory, file or ref does not exist.
    NotFound,
    /// An internal traversal invariant was violated.
    Resolution,
    /// Transport, auth or protocol failure in the backing store.
    Backend,
    /// Caller supplied something unusable (bad path, bad config, bad data).
    Invalid,
}

/// Filesystem error type.
///
/// Cloneable so a single failed fetch can be replayed to every caller
/// waiting on the same cache entry.
#[derive(Debug, Clone, Error)]
pub enum FsError {
    /// Path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A directory segment of the requested path does not exist.
    #[error("no directory found with the name {name}")]
    DirectoryNotFound { name: String },

    /// The requested file does not exist in its directory.
    #[error("file {name} not found in directory {dir}")]
    FileNotFound { name: String, dir: String },

    /// Branch or tag does not exist in the backing store.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Path escapes the backend root.
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A cache entry that must have been populated is missing.
    #[error("failed to resolve directory {path}: {reason}")]
    Resolution { path: String, reason: String },

    /// Transport, auth or protocol failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error from a local backend.
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    /// File contents are not what the caller asked for (e.g. not UTF-8).
    #[error("invalid data in {path}: {reason}")]
    InvalidData { path: String, reason: String },

    /// File contents failed to parse as JSON.
    #[error("invalid JSON in {path}: {reason}")]
    Json { path: String, reason: String },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a DirectoryNotFound error.
    pub fn directory_not_found(name: impl Into<String>) -> Self {
        Self::DirectoryNotFound { name: name.into() }
    }

    /// Create a FileNotFound error. The root directory is shown as `.`.
    pub fn file_not_found(name: impl Into<String>, dir: impl Into<String>) -> Self {
        let dir = dir.into();
        Self::FileNotFound {
            name: name.into(),
            dir: if dir.is_empty() { ".".to_string() } else { dir },
        }
    }

    /// Create a RefNotFound error.
    pub fn ref_not_found(reference: impl Into<String>) -> Self {
        Self::RefNotFound(reference.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a Resolution error.
    pub fn resolution(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a Backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound(_)
            | FsError::DirectoryNotFound { .. }
            | FsError::FileNotFound { .. }
            | FsError::RefNotFound(_) => ErrorKind::NotFound,
            FsError::Resolution { .. } => ErrorKind::Resolution,
            FsError::Backend(_) | FsError::Io(_) => ErrorKind::Backend,
            FsError::NotADirectory(_)
            | FsError::IsADirectory(_)
            | FsError::PathEscapesRoot(_)
            | FsError::InvalidPath(_)
            | FsError::InvalidData { .. }
            | FsError::Json { .. }
            | FsError::Config(_) => ErrorKind::Invalid,
        }
    }

    /// Returns true if this is a legitimate "does not exist" answer.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(e.to_string()),
            io::ErrorKind::NotADirectory => FsError::NotADirectory(e.to_string()),
            io::ErrorKind::IsADirectory => FsError::IsADirectory(e.to_string()),
            _ => FsError::Io(Arc::new(e)),
        }
    }
}

/// Convert FsError to std::io::Error for compatibility.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            e @ (FsError::DirectoryNotFound { .. }
            | FsError::FileNotFound { .. }
            | FsError::RefNotFound(_)) => io::Error::new(io::ErrorKind::NotFound, e.to_string()),
            FsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            FsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            FsError::PathEscapesRoot(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            FsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            e @ (FsError::InvalidData { .. } | FsError::Json { .. }) => {
                io::Error::new(io::ErrorKind::InvalidData, e.to_string())
            }
            FsError::Io(e) => io::Error::new(e.kind(), e.to_string()),
            e => io::Error::other(e.to_string()),
        }
    }
}

/// Filesystem result type.
pub type FsResult<T> = Result<T, FsError>;
