//! Remote tree filesystem behavior against an instrumented in-memory store.
//!
//! Every test counts round trips through `MemoryTreeSource::calls()` to
//! check that each path's resolution chain hits the store at most once.

use std::time::Duration;

use redge_fs::{
    Credential, ErrorKind, Filesystem, FsError, MemoryTreeSource, RemoteTreeBackend,
    RemoteTreeConfig, RemoteTreeFilesystem, SourceCalls, TreeNode,
};

fn remote(source: MemoryTreeSource, root: &str) -> RemoteTreeFilesystem<MemoryTreeSource> {
    let config = RemoteTreeConfig::new("main")
        .with_root(root)
        .with_token("token");
    Filesystem::new(RemoteTreeBackend::new(source, &config).unwrap())
}

fn calls(fs: &RemoteTreeFilesystem<MemoryTreeSource>) -> SourceCalls {
    fs.backend().source().calls()
}

/// A store that only returns one level per listing, so every directory has
/// to be expanded by its own node id.
fn single_level_source() -> MemoryTreeSource {
    MemoryTreeSource::new()
        .with_ref("main", "R")
        .with_tree(
            "R",
            vec![TreeNode::dir("packages", "P"), TreeNode::file("README.md", "r", 6)],
        )
        .with_tree(
            "P",
            vec![
                TreeNode::dir("frameworks", "F"),
                TreeNode::dir("fs", "S"),
                TreeNode::file("package.json", "pj", 2),
            ],
        )
        .with_tree(
            "F",
            vec![TreeNode::file("README.md", "fr", 9), TreeNode::dir("src", "FS")],
        )
        .with_tree("FS", vec![TreeNode::file("index.ts", "fi", 1)])
        .with_tree("S", vec![TreeNode::file("index.ts", "si", 1)])
        .with_blob("main", "packages/frameworks/README.md", "# frameworks")
        .with_blob("main", "README.md", "# repo")
}

#[tokio::test]
async fn test_flat_subtree_lists_descendants_without_more_calls() {
    let source = MemoryTreeSource::new().with_ref("main", "R").with_tree(
        "R",
        vec![
            TreeNode::dir("frameworks", "F"),
            TreeNode::file("frameworks/README.md", "M", 12),
        ],
    );
    let fs = remote(source, "");

    let listing = fs.read_dir("frameworks").await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "README.md");
    assert_eq!(listing[0].path, "frameworks/README.md");
    assert!(listing[0].is_file());
    assert_eq!(listing[0].metadata.node_id.as_str(), "M");
    assert_eq!(listing[0].metadata.size, Some(12));

    let after_first = calls(&fs);
    assert_eq!(after_first.resolve_ref, 1);
    assert_eq!(after_first.list_subtree, 1);
    assert_eq!(fs.backend().source().subtree_calls("F"), 0);

    let again = fs.read_dir("frameworks").await.unwrap();
    assert_eq!(again, listing);
    assert_eq!(calls(&fs), after_first);
}

#[tokio::test]
async fn test_root_listing_carries_node_ids() {
    let fs = remote(single_level_source(), "");

    let root = fs.read_dir("").await.unwrap();
    let names: Vec<_> = root.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["packages", "README.md"]);
    assert!(root[0].is_dir());
    assert_eq!(root[0].metadata.node_id.as_str(), "P");
    assert_eq!(root[0].metadata.mode, "040000");
}

#[tokio::test]
async fn test_deep_path_resolves_each_prefix_once() {
    let fs = remote(single_level_source(), "");

    let src = fs.read_dir("./packages/frameworks/src").await.unwrap();
    assert_eq!(src[0].path, "packages/frameworks/src/index.ts");

    let source = fs.backend().source();
    assert_eq!(source.calls().resolve_ref, 1);
    for node in ["R", "P", "F", "FS"] {
        assert_eq!(source.subtree_calls(node), 1, "node {node}");
    }

    // Ancestors and the target itself are all cached now.
    let before = source.calls();
    fs.read_dir("packages").await.unwrap();
    fs.read_dir("packages/frameworks").await.unwrap();
    fs.read_dir("packages/frameworks/src/").await.unwrap();
    assert_eq!(source.calls(), before);

    // A sibling only pays for its own subtree.
    fs.read_dir("packages/fs").await.unwrap();
    assert_eq!(source.calls().list_subtree, before.list_subtree + 1);
    assert_eq!(source.subtree_calls("S"), 1);
}

#[tokio::test]
async fn test_concurrent_reads_of_same_path_share_resolution() {
    let source = single_level_source().with_latency(Duration::from_millis(10));
    let fs = remote(source, "");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let fs = fs.clone();
        handles.push(tokio::spawn(async move {
            fs.read_dir("packages/frameworks").await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));

    let source = fs.backend().source();
    assert_eq!(source.calls().resolve_ref, 1);
    assert_eq!(source.calls().list_subtree, 3);
    assert_eq!(source.subtree_calls("F"), 1);
}

#[tokio::test]
async fn test_concurrent_siblings_share_common_ancestor() {
    let source = single_level_source().with_latency(Duration::from_millis(10));
    let fs = remote(source, "");

    let (frameworks, fs_dir) = tokio::join!(
        fs.read_dir("packages/frameworks"),
        fs.read_dir("packages/fs")
    );
    assert_eq!(frameworks.unwrap().len(), 2);
    assert_eq!(fs_dir.unwrap().len(), 1);

    let source = fs.backend().source();
    assert_eq!(source.calls().resolve_ref, 1);
    assert_eq!(source.subtree_calls("R"), 1);
    assert_eq!(source.subtree_calls("P"), 1);
    assert_eq!(source.subtree_calls("F"), 1);
    assert_eq!(source.subtree_calls("S"), 1);
}

#[tokio::test]
async fn test_missing_directory_names_the_segment() {
    let fs = remote(single_level_source(), "");

    let err = fs.read_dir("./packages/random").await.unwrap_err();
    assert!(matches!(err, FsError::DirectoryNotFound { ref name } if name == "random"));
    assert_eq!(err.to_string(), "no directory found with the name random");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // A file with that name is not a directory either.
    let err = fs.read_dir("packages/package.json").await.unwrap_err();
    assert!(matches!(err, FsError::DirectoryNotFound { ref name } if name == "package.json"));

    // Anything below a missing directory fails on the missing segment.
    let err = fs.read_dir("packages/random/deeper").await.unwrap_err();
    assert!(matches!(err, FsError::DirectoryNotFound { ref name } if name == "random"));
}

#[tokio::test]
async fn test_failed_lookup_is_cached() {
    let fs = remote(single_level_source(), "");

    fs.read_dir("packages/random").await.unwrap_err();
    let before = calls(&fs);
    fs.read_dir("packages/random").await.unwrap_err();
    assert_eq!(calls(&fs), before);
}

#[tokio::test]
async fn test_read_file_is_fetched_once() {
    let fs = remote(single_level_source(), "");

    let bytes = fs.read_file("packages/frameworks/README.md").await.unwrap();
    assert_eq!(bytes, b"# frameworks");
    let again = fs.read_file("./packages/frameworks/README.md").await.unwrap();
    assert_eq!(again, bytes);

    assert_eq!(calls(&fs).fetch_bytes, 1);
    assert_eq!(calls(&fs).list_subtree, 0);
}

#[tokio::test]
async fn test_missing_file_names_file_and_directory() {
    let fs = remote(single_level_source(), "");

    let err = fs.read_file("packages/frameworks/EMDAER.md").await.unwrap_err();
    assert!(matches!(
        err,
        FsError::FileNotFound { ref name, ref dir } if name == "EMDAER.md" && dir == "packages/frameworks"
    ));
    assert_eq!(
        err.to_string(),
        "file EMDAER.md not found in directory packages/frameworks"
    );
}

#[tokio::test]
async fn test_root_offsets_paths() {
    let fs = remote(single_level_source(), "packages");

    let root = fs.read_dir("").await.unwrap();
    let names: Vec<_> = root.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["frameworks", "fs", "package.json"]);
    assert_eq!(root[0].path, "frameworks");

    let frameworks = fs.read_dir("frameworks").await.unwrap();
    assert_eq!(frameworks[0].path, "frameworks/README.md");

    let bytes = fs.read_file("frameworks/README.md").await.unwrap();
    assert_eq!(bytes, b"# frameworks");

    let err = fs.read_file("frameworks/missing.md").await.unwrap_err();
    assert!(matches!(
        err,
        FsError::FileNotFound { ref name, ref dir } if name == "missing.md" && dir == "frameworks"
    ));
}

#[tokio::test]
async fn test_unknown_ref_is_not_found() {
    let source = single_level_source();
    let config = RemoteTreeConfig::new("does-not-exist").with_token("token");
    let fs = Filesystem::new(RemoteTreeBackend::new(source, &config).unwrap());

    let err = fs.read_dir("packages").await.unwrap_err();
    assert!(matches!(err, FsError::RefNotFound(ref r) if r == "does-not-exist"));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_bad_credentials_surface_as_backend_error() {
    let source = single_level_source().with_required_token("good");
    let backend = RemoteTreeBackend::with_credential(source, Credential::new("bad"), "main", "");
    let fs = Filesystem::new(backend);

    let err = fs.read_dir("").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);

    let err = fs.read_file("README.md").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_missing_credential_is_a_config_error() {
    let config = RemoteTreeConfig::new("main");
    let err = RemoteTreeBackend::new(MemoryTreeSource::new(), &config)
        .err()
        .expect("construction should fail without a token");
    assert!(matches!(err, FsError::Config(_)));
}

#[tokio::test]
async fn test_exists_and_stat() {
    let fs = remote(
        MemoryTreeSource::from_files(
            "main",
            [("packages/fs/src/index.ts", "export {}"), ("package.json", "{}")],
        ),
        "",
    );

    assert!(fs.exists("").await.unwrap());
    assert!(fs.exists("package.json").await.unwrap());
    assert!(fs.exists("packages/fs/src").await.unwrap());
    assert!(!fs.exists("packages/nope").await.unwrap());
    assert!(!fs.exists("packages/nope/deeper").await.unwrap());

    let stat = fs.stat("packages/fs/src/index.ts").await.unwrap();
    assert!(stat.is_file());
    assert_eq!(stat.metadata.size, Some(9));

    // The whole tree came back in the first listing.
    assert_eq!(calls(&fs).list_subtree, 1);
}

#[tokio::test]
async fn test_read_json_through_remote() {
    #[derive(serde::Deserialize)]
    struct Manifest {
        name: String,
    }

    let fs = remote(
        MemoryTreeSource::from_files("main", [("package.json", r#"{"name":"redge"}"#)]),
        "",
    );
    let manifest: Manifest = fs.read_json("package.json").await.unwrap();
    assert_eq!(manifest.name, "redge");
}
