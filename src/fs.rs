//! The in-memory filesystem tree and all of its mutation operations.
//!
//! A `Vfs` value is one session's filesystem: a single root directory plus
//! the current working directory (and, ephemerally, the previous one for
//! `cd -`). Values are cheap to deep-copy and the pipeline executor clones
//! one per command line, so callers never share mutable tree state.

use chrono::Utc;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::VfsError;
use crate::glob;
use crate::mode::FileMode;
use crate::node::{Node, NodeKind};
use crate::path;

/// Where a fresh session starts.
pub const HOME: &str = "/home/student";

/// A filesystem instance: root tree + working directory.
///
/// The serde shape `{ cwd, root }` is the snapshot handed to the external
/// persistence collaborator. `prev_cwd` is session-local state and is not
/// serialized; equality likewise covers only the snapshot fields.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Vfs {
    pub cwd: String,
    pub root: Node,
    #[serde(skip)]
    prev_cwd: Option<String>,
}

impl PartialEq for Vfs {
    fn eq(&self, other: &Self) -> bool {
        self.cwd == other.cwd && self.root == other.root
    }
}

/// Filters applied when listing a directory.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Include entries whose name starts with `.`.
    pub include_hidden: bool,
    /// Glob pattern matched against immediate child names only.
    pub pattern: Option<String>,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub name: String,
    pub is_dir: bool,
    pub permissions: FileMode,
    pub owner: String,
    pub group: String,
    pub size: usize,
    pub modified: chrono::DateTime<Utc>,
}

impl ListEntry {
    /// Long-format row: `<type><rwxrwxrwx> <owner> <group> <size> <date> <name>`.
    pub fn render_long(&self) -> String {
        format!(
            "{}{} {} {} {:>5} {} {}",
            if self.is_dir { 'd' } else { '-' },
            self.permissions.display(),
            self.owner,
            self.group,
            self.size,
            self.modified.format("%b %d %H:%M"),
            self.name
        )
    }
}

impl Vfs {
    /// Wrap an existing tree. `prev_cwd` starts unset.
    pub fn new(root: Node, cwd: impl Into<String>) -> Vfs {
        Vfs {
            cwd: cwd.into(),
            root,
            prev_cwd: None,
        }
    }

    /// The fixed seed structure every session starts from: a small home
    /// directory with two sample files, an `/etc` with a passwd file, and
    /// an empty `/bin`.
    pub fn seed() -> Vfs {
        let mut student = Node::dir("student");
        student.insert_child(Node::file("f1", "This is file f1."));
        student.insert_child(Node::file("f2.txt", "This is file f2.txt\nIt has two lines."));

        let mut home = Node::dir("home").owned_by("root", "root");
        home.insert_child(student);

        let mut etc = Node::dir("etc").owned_by("root", "root");
        etc.insert_child(
            Node::file(
                "passwd",
                "root:x:0:0:root:/root:/bin/bash\nstudent:x:1000:1000:Student,,,:/home/student:/bin/bash\n",
            )
            .owned_by("root", "root"),
        );

        let mut root = Node::dir("/").owned_by("root", "root");
        root.insert_child(home);
        root.insert_child(etc);
        root.insert_child(Node::dir("bin").owned_by("root", "root"));

        Vfs::new(root, HOME)
    }

    /// Resolve a path expression against this instance's cwd (and `-`
    /// against the previous cwd). Pure; no existence check.
    pub fn resolve(&self, path: &str) -> String {
        path::resolve(path, &self.cwd, self.prev_cwd.as_deref())
    }

    // ── Lookup ────────────────────────────────────────────────

    /// Walk an already-absolute path from the root.
    fn walk(&self, abs: &str) -> Result<&Node, VfsError> {
        let mut node = &self.root;
        for seg in abs.split('/').filter(|s| !s.is_empty()) {
            node = match &node.kind {
                NodeKind::Directory { children } => {
                    children.get(seg).ok_or(VfsError::PathNotFound)?
                }
                NodeKind::File { .. } => return Err(VfsError::PathNotFound),
            };
        }
        Ok(node)
    }

    fn walk_mut(&mut self, abs: &str) -> Result<&mut Node, VfsError> {
        let mut node = &mut self.root;
        for seg in abs.split('/').filter(|s| !s.is_empty()) {
            node = match &mut node.kind {
                NodeKind::Directory { children } => {
                    children.get_mut(seg).ok_or(VfsError::PathNotFound)?
                }
                NodeKind::File { .. } => return Err(VfsError::PathNotFound),
            };
        }
        Ok(node)
    }

    /// Resolve and walk. `PathNotFound` if any segment is missing or an
    /// intermediate one is not a directory.
    pub fn lookup(&self, path: &str) -> Result<&Node, VfsError> {
        let abs = self.resolve(path);
        self.walk(&abs)
    }

    /// Walk to the parent of `abs` and name the final segment.
    ///
    /// The root has no parent; callers map `None` from `split_parent` to
    /// whichever error fits their operation.
    fn parent_mut(&mut self, abs: &str) -> Result<(&mut Node, String), VfsError> {
        let (parent_abs, name) =
            path::split_parent(abs).ok_or(VfsError::PathNotFound)?;
        let parent = self.walk_mut(&parent_abs)?;
        if !parent.is_dir() {
            return Err(VfsError::NotADirectory);
        }
        Ok((parent, name))
    }

    // ── Navigation ────────────────────────────────────────────

    /// Change the working directory, recording the prior one for `cd -`.
    pub fn change_dir(&mut self, path: &str) -> Result<(), VfsError> {
        let abs = self.resolve(path);
        let node = self.walk(&abs)?;
        if !node.is_dir() {
            return Err(VfsError::NotADirectory);
        }
        self.prev_cwd = Some(std::mem::replace(&mut self.cwd, abs));
        Ok(())
    }

    // ── Mutation ──────────────────────────────────────────────

    /// Create an empty directory. The parent must already exist; missing
    /// intermediate directories are not created.
    pub fn make_dir(&mut self, path: &str) -> Result<(), VfsError> {
        let abs = self.resolve(path);
        if abs == path::ROOT {
            return Err(VfsError::AlreadyExists);
        }
        let (parent, name) = self.parent_mut(&abs)?;
        let children = parent.children_mut().ok_or(VfsError::NotADirectory)?;
        if children.contains_key(&name) {
            return Err(VfsError::AlreadyExists);
        }
        children.insert(name.clone(), Node::dir(&name));
        parent.modified = Utc::now();
        trace!("mkdir {}", abs);
        Ok(())
    }

    /// Remove an empty directory.
    pub fn remove_dir(&mut self, path: &str) -> Result<(), VfsError> {
        let abs = self.resolve(path);
        if abs == path::ROOT {
            return Err(VfsError::DirectoryNotEmpty);
        }
        let (parent, name) = self.parent_mut(&abs)?;
        let children = parent.children_mut().ok_or(VfsError::NotADirectory)?;
        let empty = match children.get(&name) {
            None => return Err(VfsError::PathNotFound),
            Some(child) => match child.children() {
                None => return Err(VfsError::NotADirectory),
                Some(grand) => grand.is_empty(),
            },
        };
        if !empty {
            return Err(VfsError::DirectoryNotEmpty);
        }
        children.shift_remove(&name);
        parent.modified = Utc::now();
        trace!("rmdir {}", abs);
        Ok(())
    }

    /// Bump an existing node's timestamp, or create an empty file.
    pub fn touch(&mut self, path: &str) -> Result<(), VfsError> {
        let abs = self.resolve(path);
        let exists = self.walk(&abs).is_ok();
        if exists {
            let node = self.walk_mut(&abs)?;
            node.modified = Utc::now();
            return Ok(());
        }
        let (parent, name) = self.parent_mut(&abs)?;
        let children = parent.children_mut().ok_or(VfsError::NotADirectory)?;
        children.insert(name.clone(), Node::file(&name, ""));
        parent.modified = Utc::now();
        Ok(())
    }

    /// Replace or append a file's content, creating it when missing.
    ///
    /// The parent must exist; its absence propagates as `PathNotFound`.
    pub fn write_file(&mut self, path: &str, content: &str, append: bool) -> Result<(), VfsError> {
        let abs = self.resolve(path);
        let exists = self.walk(&abs).is_ok();
        if exists {
            let node = self.walk_mut(&abs)?;
            match &mut node.kind {
                NodeKind::File { content: existing } => {
                    if append {
                        existing.push_str(content);
                    } else {
                        existing.clear();
                        existing.push_str(content);
                    }
                }
                NodeKind::Directory { .. } => return Err(VfsError::NotAFile),
            }
            node.modified = Utc::now();
            trace!("write {} ({} bytes)", abs, content.len());
            return Ok(());
        }
        let (parent, name) = self.parent_mut(&abs)?;
        let children = parent.children_mut().ok_or(VfsError::NotADirectory)?;
        children.insert(name.clone(), Node::file(&name, content));
        parent.modified = Utc::now();
        trace!("create {} ({} bytes)", abs, content.len());
        Ok(())
    }

    /// Read a file's content. `NotAFile` for directories.
    pub fn read_file(&self, path: &str) -> Result<String, VfsError> {
        let node = self.lookup(path)?;
        match &node.kind {
            NodeKind::File { content } => Ok(content.clone()),
            NodeKind::Directory { .. } => Err(VfsError::NotAFile),
        }
    }

    /// Remove a single file. Never removes directories: a non-empty one
    /// fails with `DirectoryNotEmpty`, an empty one with `NotAFile` (use
    /// `remove_dir` for those).
    pub fn remove(&mut self, path: &str) -> Result<(), VfsError> {
        let abs = self.resolve(path);
        if abs == path::ROOT {
            return Err(VfsError::NotAFile);
        }
        let (parent, name) = self.parent_mut(&abs)?;
        let children = parent.children_mut().ok_or(VfsError::NotADirectory)?;
        let dir_state = match children.get(&name) {
            None => return Err(VfsError::PathNotFound),
            Some(child) => child.children().map(|grand| grand.is_empty()),
        };
        match dir_state {
            Some(false) => Err(VfsError::DirectoryNotEmpty),
            Some(true) => Err(VfsError::NotAFile),
            None => {
                children.shift_remove(&name);
                parent.modified = Utc::now();
                trace!("rm {}", abs);
                Ok(())
            }
        }
    }

    /// Where a copy or move of `src_abs` aimed at `dst_abs` actually lands:
    /// inside an existing directory under the source's basename, or at the
    /// literal destination path otherwise.
    fn copy_target(&self, src_abs: &str, dst_abs: &str) -> String {
        match self.walk(dst_abs) {
            Ok(node) if node.is_dir() => {
                let name = path::basename(src_abs);
                if dst_abs == path::ROOT {
                    format!("/{}", name)
                } else {
                    format!("{}/{}", dst_abs, name)
                }
            }
            _ => String::from(dst_abs),
        }
    }

    /// Copy a file. Directories are not supported. The copy is an
    /// independent node: later mutation of either side leaves the other
    /// untouched.
    pub fn copy(&mut self, src: &str, dst: &str) -> Result<(), VfsError> {
        let src_abs = self.resolve(src);
        let content = match &self.walk(&src_abs)?.kind {
            NodeKind::File { content } => content.clone(),
            NodeKind::Directory { .. } => return Err(VfsError::NotAFile),
        };
        let dst_abs = self.resolve(dst);
        let target = self.copy_target(&src_abs, &dst_abs);
        self.write_file(&target, &content, false)
    }

    /// Move a file: copy + removal of the source as one all-or-nothing
    /// operation. The moved node keeps its permissions and ownership.
    pub fn rename(&mut self, src: &str, dst: &str) -> Result<(), VfsError> {
        let src_abs = self.resolve(src);
        let src_node = self.walk(&src_abs)?.clone();
        if src_node.is_dir() {
            return Err(VfsError::NotAFile);
        }
        let dst_abs = self.resolve(dst);
        let target = self.copy_target(&src_abs, &dst_abs);
        if target == src_abs {
            return Ok(());
        }
        // Validate the destination before touching anything, so a bad
        // destination leaves the source in place.
        let (parent, name) = self.parent_mut(&target)?;
        let children = parent.children_mut().ok_or(VfsError::NotADirectory)?;
        let mut moved = src_node;
        moved.name = name.clone();
        children.insert(name, moved);
        parent.modified = Utc::now();
        self.remove(&src_abs)
    }

    /// Parse and apply a permission mode.
    pub fn set_permissions(&mut self, path: &str, mode_text: &str) -> Result<(), VfsError> {
        let mode = FileMode::parse(mode_text)?;
        let abs = self.resolve(path);
        let node = self.walk_mut(&abs)?;
        node.permissions = mode;
        node.modified = Utc::now();
        Ok(())
    }

    // ── Listing ───────────────────────────────────────────────

    /// Enumerate a directory's immediate children in insertion order.
    ///
    /// Hidden entries (leading `.`) are skipped unless requested; an
    /// optional glob pattern filters child names. Never recurses.
    pub fn list(&self, path: &str, opts: &ListOptions) -> Result<Vec<ListEntry>, VfsError> {
        let node = self.lookup(path)?;
        let children = node.children().ok_or(VfsError::NotADirectory)?;
        let mut entries = Vec::new();
        for (name, child) in children {
            if !opts.include_hidden && name.starts_with('.') {
                continue;
            }
            if let Some(pattern) = &opts.pattern {
                if !glob::glob_match(pattern, name)? {
                    continue;
                }
            }
            entries.push(ListEntry {
                name: name.clone(),
                is_dir: child.is_dir(),
                permissions: child.permissions,
                owner: child.owner.clone(),
                group: child.group.clone(),
                size: child.size(),
                modified: child.modified,
            });
        }
        Ok(entries)
    }

    // ── Snapshot ──────────────────────────────────────────────

    /// Serialize the `{ cwd, root }` snapshot for the persistence layer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Rebuild a filesystem from a persisted snapshot.
    pub fn from_json(text: &str) -> Result<Vfs, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_layout() {
        let vfs = Vfs::seed();
        assert_eq!(vfs.cwd, "/home/student");
        assert!(vfs.lookup("/home/student/f1").unwrap().is_file());
        assert!(vfs.lookup("/home/student/f2.txt").unwrap().is_file());
        assert!(vfs.lookup("/etc/passwd").unwrap().is_file());
        assert!(vfs.lookup("/bin").unwrap().is_dir());
        assert!(vfs
            .lookup("/bin")
            .unwrap()
            .children()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn lookup_missing_and_through_file() {
        let vfs = Vfs::seed();
        assert_eq!(vfs.lookup("/nope"), Err(VfsError::PathNotFound));
        // f1 is a file; walking through it cannot succeed
        assert_eq!(vfs.lookup("/home/student/f1/x"), Err(VfsError::PathNotFound));
    }

    #[test]
    fn change_dir_and_previous() {
        let mut vfs = Vfs::seed();
        vfs.change_dir("/etc").unwrap();
        assert_eq!(vfs.cwd, "/etc");
        vfs.change_dir("-").unwrap();
        assert_eq!(vfs.cwd, "/home/student");
        vfs.change_dir("-").unwrap();
        assert_eq!(vfs.cwd, "/etc");
    }

    #[test]
    fn change_dir_rejects_files() {
        let mut vfs = Vfs::seed();
        assert_eq!(vfs.change_dir("f1"), Err(VfsError::NotADirectory));
        assert_eq!(vfs.cwd, "/home/student");
    }

    #[test]
    fn make_dir_basics() {
        let mut vfs = Vfs::seed();
        vfs.make_dir("projects").unwrap();
        assert!(vfs.lookup("/home/student/projects").unwrap().is_dir());
        assert_eq!(vfs.make_dir("projects"), Err(VfsError::AlreadyExists));
        // no intermediate creation
        assert_eq!(vfs.make_dir("a/b/c"), Err(VfsError::PathNotFound));
    }

    #[test]
    fn remove_dir_contract() {
        let mut vfs = Vfs::seed();
        vfs.make_dir("empty").unwrap();
        vfs.remove_dir("empty").unwrap();
        assert_eq!(vfs.lookup("empty"), Err(VfsError::PathNotFound));
        assert_eq!(vfs.remove_dir("/home"), Err(VfsError::DirectoryNotEmpty));
        assert_eq!(vfs.remove_dir("f1"), Err(VfsError::NotADirectory));
        assert_eq!(vfs.remove_dir("ghost"), Err(VfsError::PathNotFound));
    }

    #[test]
    fn touch_creates_and_bumps() {
        let mut vfs = Vfs::seed();
        vfs.touch("new.txt").unwrap();
        assert_eq!(vfs.read_file("new.txt").unwrap(), "");

        let before = vfs.lookup("f1").unwrap().modified;
        vfs.touch("f1").unwrap();
        let after = vfs.lookup("f1").unwrap().modified;
        assert!(after >= before);
        assert_eq!(vfs.read_file("f1").unwrap(), "This is file f1.");
        // parent of a new file must exist
        assert_eq!(vfs.touch("ghost/file"), Err(VfsError::PathNotFound));
    }

    #[test]
    fn write_read_append() {
        let mut vfs = Vfs::seed();
        vfs.write_file("out.txt", "one\n", false).unwrap();
        assert_eq!(vfs.read_file("out.txt").unwrap(), "one\n");
        vfs.write_file("out.txt", "two\n", true).unwrap();
        assert_eq!(vfs.read_file("out.txt").unwrap(), "one\ntwo\n");
        vfs.write_file("out.txt", "fresh", false).unwrap();
        assert_eq!(vfs.read_file("out.txt").unwrap(), "fresh");
        assert_eq!(
            vfs.write_file("/ghost/out.txt", "x", false),
            Err(VfsError::PathNotFound)
        );
        assert_eq!(vfs.write_file("/etc", "x", false), Err(VfsError::NotAFile));
    }

    #[test]
    fn read_file_rejects_directories() {
        let vfs = Vfs::seed();
        assert_eq!(vfs.read_file("/etc"), Err(VfsError::NotAFile));
    }

    #[test]
    fn remove_files_only() {
        let mut vfs = Vfs::seed();
        vfs.remove("f1").unwrap();
        assert_eq!(vfs.lookup("f1"), Err(VfsError::PathNotFound));
        // the sibling survives
        assert!(vfs.lookup("f2.txt").is_ok());

        assert_eq!(vfs.remove("/home"), Err(VfsError::DirectoryNotEmpty));
        vfs.make_dir("empty").unwrap();
        assert_eq!(vfs.remove("empty"), Err(VfsError::NotAFile));
        assert_eq!(vfs.remove("ghost"), Err(VfsError::PathNotFound));
    }

    #[test]
    fn copy_is_independent() {
        let mut vfs = Vfs::seed();
        vfs.copy("f1", "f1.bak").unwrap();
        vfs.write_file("f1.bak", "mutated", false).unwrap();
        assert_eq!(vfs.read_file("f1").unwrap(), "This is file f1.");
        assert_eq!(vfs.read_file("f1.bak").unwrap(), "mutated");
    }

    #[test]
    fn copy_into_directory_keeps_name() {
        let mut vfs = Vfs::seed();
        vfs.copy("f1", "/bin").unwrap();
        assert_eq!(vfs.read_file("/bin/f1").unwrap(), "This is file f1.");
    }

    #[test]
    fn copy_rejects_directories() {
        let mut vfs = Vfs::seed();
        assert_eq!(vfs.copy("/etc", "/bin"), Err(VfsError::NotAFile));
    }

    #[test]
    fn rename_moves_in_one_step() {
        let mut vfs = Vfs::seed();
        vfs.set_permissions("f1", "700").unwrap();
        vfs.rename("f1", "renamed").unwrap();
        assert_eq!(vfs.lookup("f1"), Err(VfsError::PathNotFound));
        let node = vfs.lookup("renamed").unwrap();
        assert_eq!(node.permissions, FileMode(0o700));
        assert_eq!(vfs.read_file("renamed").unwrap(), "This is file f1.");
    }

    #[test]
    fn rename_into_directory() {
        let mut vfs = Vfs::seed();
        vfs.rename("f2.txt", "/bin").unwrap();
        assert_eq!(vfs.lookup("f2.txt"), Err(VfsError::PathNotFound));
        assert!(vfs.lookup("/bin/f2.txt").unwrap().is_file());
    }

    #[test]
    fn rename_fails_whole_on_bad_destination() {
        let mut vfs = Vfs::seed();
        assert_eq!(
            vfs.rename("f1", "/ghost/f1"),
            Err(VfsError::PathNotFound)
        );
        // nothing moved
        assert!(vfs.lookup("f1").is_ok());
    }

    #[test]
    fn set_permissions_contract() {
        let mut vfs = Vfs::seed();
        vfs.set_permissions("f1", "754").unwrap();
        assert_eq!(vfs.lookup("f1").unwrap().permissions, FileMode(0o754));
        assert!(matches!(
            vfs.set_permissions("f1", "999"),
            Err(VfsError::InvalidMode(_))
        ));
        assert_eq!(
            vfs.set_permissions("ghost", "644"),
            Err(VfsError::PathNotFound)
        );
    }

    #[test]
    fn list_hidden_and_glob() {
        let mut vfs = Vfs::seed();
        vfs.touch(".hidden").unwrap();
        let plain = vfs.list(".", &ListOptions::default()).unwrap();
        assert!(plain.iter().all(|e| e.name != ".hidden"));

        let all = vfs
            .list(
                ".",
                &ListOptions {
                    include_hidden: true,
                    pattern: None,
                },
            )
            .unwrap();
        assert!(all.iter().any(|e| e.name == ".hidden"));

        let txt = vfs
            .list(
                ".",
                &ListOptions {
                    include_hidden: false,
                    pattern: Some(String::from("*.txt")),
                },
            )
            .unwrap();
        let names: Vec<&str> = txt.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["f2.txt"]);
    }

    #[test]
    fn list_rejects_files_and_bad_patterns() {
        let vfs = Vfs::seed();
        assert_eq!(
            vfs.list("f1", &ListOptions::default()),
            Err(VfsError::NotADirectory)
        );
        let opts = ListOptions {
            include_hidden: false,
            pattern: Some(String::from("f[1")),
        };
        assert!(matches!(
            vfs.list(".", &opts),
            Err(VfsError::InvalidPattern(_))
        ));
    }

    #[test]
    fn long_format_rendering() {
        let mut vfs = Vfs::seed();
        vfs.set_permissions("f1", "754").unwrap();
        let entries = vfs.list(".", &ListOptions::default()).unwrap();
        let row = entries
            .iter()
            .find(|e| e.name == "f1")
            .unwrap()
            .render_long();
        assert!(row.starts_with("-rwxr-xr--"));
        assert!(row.ends_with(" f1"));
        assert!(row.contains(" student student "));
    }

    #[test]
    fn snapshot_round_trip() {
        let mut vfs = Vfs::seed();
        vfs.make_dir("work").unwrap();
        vfs.write_file("work/notes", "a\nb\n", false).unwrap();
        vfs.change_dir("work").unwrap();
        let json = vfs.to_json().unwrap();
        let back = Vfs::from_json(&json).unwrap();
        assert_eq!(vfs, back);
        assert_eq!(back.cwd, "/home/student/work");
    }
}
