//! Pure path resolution.
//!
//! Maps a path expression plus the current (and previous) working directory
//! to an absolute, normalized path. These functions only look at strings;
//! whether the result exists in the tree is the tree layer's concern.

/// The absolute root path.
pub const ROOT: &str = "/";

/// Resolve a path expression against the current working directory.
///
/// `-` resolves to `prev_cwd` (or `cwd` when none has been recorded yet),
/// overriding everything else. A leading `/` makes the path absolute;
/// anything else is joined onto `cwd`. `.` and empty segments are dropped,
/// `..` pops one resolved segment and clamps at the root.
pub fn resolve(path: &str, cwd: &str, prev_cwd: Option<&str>) -> String {
    if path == "-" {
        return String::from(prev_cwd.unwrap_or(cwd));
    }
    if path.starts_with('/') {
        normalize(path)
    } else {
        normalize(&format!("{}/{}", cwd, path))
    }
}

/// Collapse `.`, `..`, and repeated or trailing separators.
///
/// Popping past the root is a no-op: the result never gets shorter than `/`.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            c => parts.push(c),
        }
    }
    if parts.is_empty() {
        String::from(ROOT)
    } else {
        let mut result = String::new();
        for p in &parts {
            result.push('/');
            result.push_str(p);
        }
        result
    }
}

/// Split an absolute path into `(parent, basename)`. `None` for the root,
/// which has no parent.
pub fn split_parent(path: &str) -> Option<(String, String)> {
    let norm = normalize(path);
    if norm == ROOT {
        return None;
    }
    let idx = norm.rfind('/')?;
    let parent = if idx == 0 {
        String::from(ROOT)
    } else {
        String::from(&norm[..idx])
    };
    let name = String::from(&norm[idx + 1..]);
    Some((parent, name))
}

/// Final segment of a path; `/` for the root itself.
pub fn basename(path: &str) -> String {
    split_parent(path)
        .map(|(_, name)| name)
        .unwrap_or_else(|| String::from(ROOT))
}
