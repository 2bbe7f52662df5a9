//! The remote store capability consumed by the tree backend.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Credential;
use crate::error::FsResult;
use crate::types::FileType;

/// Opaque backend handle addressing a subtree (e.g. a content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap a raw id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Node kind as the store reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// File contents.
    Blob,
    /// Directory.
    Tree,
}

impl From<NodeKind> for FileType {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Blob => FileType::File,
            NodeKind::Tree => FileType::Directory,
        }
    }
}

/// One descendant in a flat subtree listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Path relative to the node that was listed (`a/b/c.md`).
    pub path: String,
    /// Blob or tree.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Handle for this node.
    #[serde(rename = "sha")]
    pub id: NodeId,
    /// Size in bytes, for blobs.
    #[serde(default)]
    pub size: Option<u64>,
    /// Raw mode string (`100644`, `040000`, ...).
    #[serde(default)]
    pub mode: String,
}

impl TreeNode {
    /// A blob node.
    pub fn file(path: impl Into<String>, id: impl Into<NodeId>, size: u64) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Blob,
            id: id.into(),
            size: Some(size),
            mode: "100644".to_string(),
        }
    }

    /// A tree node.
    pub fn dir(path: impl Into<String>, id: impl Into<NodeId>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Tree,
            id: id.into(),
            size: None,
            mode: "040000".to_string(),
        }
    }

    /// Override the mode string.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

/// Remote tree store, addressed by node id rather than by path.
///
/// Transport, auth and retries live behind this trait; the filesystem never
/// retries a failed call.
#[async_trait]
pub trait TreeSource: Send + Sync + 'static {
    /// Root node id of a branch or tag. Fails with `RefNotFound`.
    async fn resolve_ref(&self, credential: &Credential, reference: &str) -> FsResult<NodeId>;

    /// Every descendant of `node` (not just its immediate children), with
    /// paths relative to `node`. Fails with `Backend` on transport errors.
    async fn list_subtree(&self, credential: &Credential, node: &NodeId) -> FsResult<Vec<TreeNode>>;

    /// Raw bytes of the file at `path` (relative to the top of the tree) at
    /// `reference`. Fails with `NotFound` if absent.
    async fn fetch_bytes(
        &self,
        credential: &Credential,
        reference: &str,
        path: &str,
    ) -> FsResult<Vec<u8>>;
}
