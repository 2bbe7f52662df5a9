//! Slash-separated path helpers.
//!
//! Every path handed to a filesystem is relative to that filesystem's root.
//! `""` is the root itself, `a/b` is a child of `a`. Leading `/` and `./`
//! are ignored and `..` never climbs above the root, so a normalized path
//! never contains `.` or `..` segments.

/// Canonicalize separators and drop redundant segments.
///
/// Both `/` and `\` are accepted as separators; the result always uses `/`.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Join `name` onto `base` and normalize the result.
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        normalize(name)
    } else if name.is_empty() {
        normalize(base)
    } else {
        normalize(&format!("{base}/{name}"))
    }
}

/// Parent of a normalized path. The root has no parent.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or(""))
}

/// Last segment of a normalized path (empty for the root).
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// Every ancestor prefix of `path`, from the root down to `path` itself.
///
/// `a/b/c` yields `["", "a", "a/b", "a/b/c"]`. Directory resolution must
/// visit the prefixes in exactly this order: each step needs its parent's
/// listing to already be known.
pub fn decompose(path: &str) -> Vec<String> {
    let normalized = normalize(path);
    let mut prefixes = vec![String::new()];
    if normalized.is_empty() {
        return prefixes;
    }

    let mut current = String::new();
    for segment in normalized.split('/') {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}

/// Strip `root` from the front of `path`, if `path` lives under it.
pub fn strip_root<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    if root.is_empty() {
        return Some(path);
    }
    if path == root {
        return Some("");
    }
    path.strip_prefix(root)?.strip_prefix('/')
}
