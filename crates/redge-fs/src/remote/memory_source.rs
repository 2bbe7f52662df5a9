//! In-memory [`TreeSource`].
//!
//! Serves a fixed snapshot of one or more refs. Every call is counted, so
//! tests can assert how many round trips a sequence of reads cost.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::Credential;
use crate::error::{FsError, FsResult};
use crate::path;
use crate::remote::source::{NodeId, TreeNode, TreeSource};

/// Snapshot of how many times each capability was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCalls {
    pub resolve_ref: usize,
    pub list_subtree: usize,
    pub fetch_bytes: usize,
}

#[derive(Debug, Default)]
struct Counters {
    resolve_ref: AtomicUsize,
    list_subtree: AtomicUsize,
    fetch_bytes: AtomicUsize,
}

/// Tree store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryTreeSource {
    refs: HashMap<String, NodeId>,
    trees: HashMap<NodeId, Vec<TreeNode>>,
    blobs: HashMap<(String, String), Vec<u8>>,
    required_token: Option<String>,
    latency: Option<Duration>,
    counters: Counters,
    listed: Mutex<HashMap<NodeId, usize>>,
}

impl MemoryTreeSource {
    /// An empty store with no refs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store for `reference` from `(path, contents)` pairs.
    ///
    /// Every directory gets the id `tree:<path>` (`tree:` for the top) and
    /// every file `blob:<path>`. Listing a tree returns all its descendants.
    pub fn from_files<P, D>(reference: &str, files: impl IntoIterator<Item = (P, D)>) -> Self
    where
        P: AsRef<str>,
        D: Into<Vec<u8>>,
    {
        let mut source = Self::new();
        let mut dirs = BTreeSet::new();
        let mut nodes = Vec::new();

        for (file, data) in files {
            let file = path::normalize(file.as_ref());
            let data = data.into();
            let mut parent = path::parent(&file);
            while let Some(dir) = parent {
                if !dir.is_empty() {
                    dirs.insert(dir.to_string());
                }
                parent = path::parent(dir);
            }
            nodes.push(TreeNode::file(file.clone(), format!("blob:{file}").as_str(), data.len() as u64));
            source.blobs.insert((reference.to_string(), file), data);
        }
        for dir in &dirs {
            nodes.push(TreeNode::dir(dir.clone(), format!("tree:{dir}").as_str()));
        }
        nodes.sort_by(|a, b| a.path.cmp(&b.path));

        source.refs.insert(reference.to_string(), NodeId::new("tree:"));
        source.trees.insert(NodeId::new("tree:"), nodes.clone());
        for dir in &dirs {
            let prefix = format!("{dir}/");
            let subtree = nodes
                .iter()
                .filter_map(|node| {
                    let rel = node.path.strip_prefix(&prefix)?;
                    Some(TreeNode {
                        path: rel.to_string(),
                        ..node.clone()
                    })
                })
                .collect();
            source.trees.insert(NodeId::new(format!("tree:{dir}")), subtree);
        }
        source
    }

    /// Point `reference` at `root`.
    pub fn with_ref(mut self, reference: impl Into<String>, root: impl Into<NodeId>) -> Self {
        self.refs.insert(reference.into(), root.into());
        self
    }

    /// Set the flat listing returned for `node`.
    pub fn with_tree(mut self, node: impl Into<NodeId>, nodes: Vec<TreeNode>) -> Self {
        self.trees.insert(node.into(), nodes);
        self
    }

    /// Add file contents at `path` for `reference`.
    pub fn with_blob(
        mut self,
        reference: impl Into<String>,
        path: &str,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.blobs
            .insert((reference.into(), path::normalize(path)), data.into());
        self
    }

    /// Reject every call whose credential is not `token`.
    pub fn with_required_token(mut self, token: impl Into<String>) -> Self {
        self.required_token = Some(token.into());
        self
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> SourceCalls {
        SourceCalls {
            resolve_ref: self.counters.resolve_ref.load(Ordering::SeqCst),
            list_subtree: self.counters.list_subtree.load(Ordering::SeqCst),
            fetch_bytes: self.counters.fetch_bytes.load(Ordering::SeqCst),
        }
    }

    /// How many times `node` was listed.
    pub fn subtree_calls(&self, node: &str) -> usize {
        self.listed
            .lock()
            .get(&NodeId::new(node))
            .copied()
            .unwrap_or(0)
    }

    async fn round_trip(&self, credential: &Credential) -> FsResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match &self.required_token {
            Some(token) if token != credential.expose() => {
                Err(FsError::backend("401 Unauthorized: bad credentials"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl TreeSource for MemoryTreeSource {
    async fn resolve_ref(&self, credential: &Credential, reference: &str) -> FsResult<NodeId> {
        self.counters.resolve_ref.fetch_add(1, Ordering::SeqCst);
        self.round_trip(credential).await?;
        self.refs
            .get(reference)
            .cloned()
            .ok_or_else(|| FsError::ref_not_found(reference))
    }

    async fn list_subtree(&self, credential: &Credential, node: &NodeId) -> FsResult<Vec<TreeNode>> {
        self.counters.list_subtree.fetch_add(1, Ordering::SeqCst);
        *self.listed.lock().entry(node.clone()).or_default() += 1;
        self.round_trip(credential).await?;
        self.trees
            .get(node)
            .cloned()
            .ok_or_else(|| FsError::backend(format!("422 Unprocessable: unknown tree {node}")))
    }

    async fn fetch_bytes(
        &self,
        credential: &Credential,
        reference: &str,
        path: &str,
    ) -> FsResult<Vec<u8>> {
        self.counters.fetch_bytes.fetch_add(1, Ordering::SeqCst);
        self.round_trip(credential).await?;
        self.blobs
            .get(&(reference.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| FsError::not_found(path))
    }
}
