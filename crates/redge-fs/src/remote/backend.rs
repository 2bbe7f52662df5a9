//! Remote tree backend.
//!
//! The store only understands node ids: "resolve this ref to a root node"
//! and "list everything under this node". Listing a directory by path is
//! rebuilt from those two calls by walking the path's prefixes from the top
//! of the tree down, each step finding the next directory's node id in the
//! listing of the step before.
//!
//! A flat subtree response already describes every directory below the
//! listed node, so those listings are cached straight away. Directories with
//! nothing visible below them (empty, or the store only returned one level)
//! are expanded by their own node id when first asked for.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use crate::cache::DirCache;
use crate::config::{Credential, RemoteTreeConfig};
use crate::error::{FsError, FsResult};
use crate::ops::Backend;
use crate::path;
use crate::remote::source::{NodeId, NodeKind, TreeNode, TreeSource};
use crate::types::Stat;

/// Metadata for remote entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMeta {
    /// Node id; for directories, the handle used to expand them.
    pub node_id: NodeId,
    /// Size in bytes, for files.
    pub size: Option<u64>,
    /// Raw mode string from the store.
    pub mode: String,
    /// Raw node kind from the store.
    pub kind: NodeKind,
}

/// Read-only backend over a [`TreeSource`].
pub struct RemoteTreeBackend<S: TreeSource> {
    source: S,
    credential: Credential,
    reference: String,
    root: String,
}

impl<S: TreeSource> RemoteTreeBackend<S> {
    /// Create a backend from a config, resolving its credential.
    pub fn new(source: S, config: &RemoteTreeConfig) -> FsResult<Self> {
        config.validate()?;
        let credential = config.resolve_credential()?;
        Ok(Self::with_credential(
            source,
            credential,
            config.reference.clone(),
            &config.normalized_root(),
        ))
    }

    /// Create a backend from explicit parts.
    pub fn with_credential(
        source: S,
        credential: Credential,
        reference: impl Into<String>,
        root: &str,
    ) -> Self {
        Self {
            source,
            credential,
            reference: reference.into(),
            root: path::normalize(root),
        }
    }

    /// The underlying store.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Branch or tag being read.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Root directory inside the tree (`""` for the top).
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Walk `target`'s prefixes top-down, resolving each one that is not
    /// cached yet, then return `target`'s listing.
    ///
    /// Cache keys are paths from the top of the tree, not from `root`.
    async fn walk(
        self: Arc<Self>,
        target: String,
        dirs: DirCache<RemoteMeta>,
    ) -> FsResult<Vec<Stat<RemoteMeta>>> {
        let mut parent: Option<String> = None;
        for prefix in path::decompose(&target) {
            let backend = Arc::clone(&self);
            let cache = dirs.clone();
            let key = prefix.clone();
            let parent_key = parent.take();
            dirs.get_or_create(&prefix, move || async move {
                match parent_key {
                    None => backend.resolve_top(&cache).await,
                    Some(parent_key) => backend.resolve_child(&parent_key, &key, &cache).await,
                }
            })
            .await?;
            parent = Some(prefix);
        }

        match dirs.get(&target) {
            Some(listing) => listing.await,
            None => Err(FsError::resolution(&target, "listing missing after walk")),
        }
    }

    /// Listing of the top of the tree: ref → root node → flat subtree.
    async fn resolve_top(&self, dirs: &DirCache<RemoteMeta>) -> FsResult<Vec<Stat<RemoteMeta>>> {
        let node = self
            .source
            .resolve_ref(&self.credential, &self.reference)
            .await?;
        tracing::debug!(reference = %self.reference, node_id = %node, "resolved ref");
        self.expand("", &node, dirs).await
    }

    /// Listing of `key`, found by name in its parent's listing.
    async fn resolve_child(
        &self,
        parent_key: &str,
        key: &str,
        dirs: &DirCache<RemoteMeta>,
    ) -> FsResult<Vec<Stat<RemoteMeta>>> {
        let Some(parent) = dirs.get(parent_key) else {
            return Err(FsError::resolution(
                key,
                format!("parent {parent_key:?} has not been read yet"),
            ));
        };
        let siblings = parent.await?;

        let name = path::file_name(key);
        let dir = siblings
            .iter()
            .find(|entry| entry.is_dir() && entry.name == name)
            .ok_or_else(|| FsError::directory_not_found(name))?;

        self.expand(key, &dir.metadata.node_id, dirs).await
    }

    /// Fetch `node`'s flat subtree, cache the listings of every directory it
    /// fully describes, and return the listing of `key` itself.
    async fn expand(
        &self,
        key: &str,
        node: &NodeId,
        dirs: &DirCache<RemoteMeta>,
    ) -> FsResult<Vec<Stat<RemoteMeta>>> {
        let nodes = self
            .source
            .list_subtree(&self.credential, node)
            .await
            .inspect_err(|e| {
                tracing::warn!(dir = key, node_id = %node, error = %e, "subtree fetch failed");
            })?;
        tracing::debug!(dir = key, node_id = %node, entries = nodes.len(), "fetched subtree");

        let (listing, descendants) = self.split_subtree(key, nodes);
        for (dir, entries) in descendants {
            if dirs.insert_ready(dir.clone(), entries) {
                tracing::trace!(dir = %dir, "seeded listing from flat subtree");
            }
        }
        Ok(listing)
    }

    /// Group a flat subtree under `key` by parent directory.
    ///
    /// Returns `key`'s own listing and the listings of descendant
    /// directories that have at least one entry in the response.
    fn split_subtree(
        &self,
        key: &str,
        nodes: Vec<TreeNode>,
    ) -> (Vec<Stat<RemoteMeta>>, HashMap<String, Vec<Stat<RemoteMeta>>>) {
        let mut listing = Vec::new();
        let mut descendants: HashMap<String, Vec<Stat<RemoteMeta>>> = HashMap::new();

        for node in nodes {
            let rel = path::normalize(&node.path);
            if rel.is_empty() {
                continue;
            }
            let full = path::join(key, &rel);
            let stat = Stat::new(
                path::file_name(&rel),
                self.visible_path(&full),
                node.kind.into(),
                RemoteMeta {
                    node_id: node.id,
                    size: node.size,
                    mode: node.mode,
                    kind: node.kind,
                },
            );

            match path::parent(&rel) {
                Some("") | None => listing.push(stat),
                Some(_) => {
                    let dir = path::parent(&full).unwrap_or_default().to_string();
                    descendants.entry(dir).or_default().push(stat);
                }
            }
        }
        (listing, descendants)
    }

    /// Path as callers of this filesystem see it (relative to `root`).
    fn visible_path(&self, full: &str) -> String {
        path::strip_root(&self.root, full)
            .unwrap_or(full)
            .to_string()
    }
}

#[async_trait]
impl<S: TreeSource> Backend for RemoteTreeBackend<S> {
    type Meta = RemoteMeta;

    async fn fetch_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let full = path::join(&self.root, path);
        tracing::debug!(path = %full, reference = %self.reference, "fetching file");
        self.source
            .fetch_bytes(&self.credential, &self.reference, &full)
            .await
            .map_err(|e| match e {
                FsError::NotFound(_) => FsError::file_not_found(
                    path::file_name(path),
                    path::parent(path).unwrap_or_default(),
                ),
                e => e,
            })
    }

    fn read_dir(
        self: Arc<Self>,
        path: String,
        dirs: DirCache<RemoteMeta>,
    ) -> BoxFuture<'static, FsResult<Vec<Stat<RemoteMeta>>>> {
        let target = path::join(&self.root, &path);
        self.walk(target, dirs).boxed()
    }
}
