//! The filesystem node model.
//!
//! A tagged union of files and directories. Directories exclusively own
//! their children in an insertion-ordered map; there are no parent
//! back-references (a parent is recovered by re-walking from the root).
//! The serde shape is the persisted snapshot contract: an internal
//! `"type"` tag, permissions as a bare integer, timestamps as RFC 3339.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::mode::FileMode;

/// Owner and group stamped onto nodes created during a session.
pub const DEFAULT_OWNER: &str = "student";
pub const DEFAULT_GROUP: &str = "student";

/// Nominal size reported for directories in listings.
pub const DIR_SIZE: usize = 4096;

/// A single entry in the virtual filesystem tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub permissions: FileMode,
    pub owner: String,
    pub group: String,
    pub modified: DateTime<Utc>,
}

/// File/directory discriminant plus the variant-specific payload.
///
/// Kept as a sum type so every operation site matches exhaustively; a
/// missed case is a compile error, not a runtime surprise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    File { content: String },
    Directory { children: IndexMap<String, Node> },
}

impl Node {
    /// New file with default mode, owner, and group, stamped now.
    pub fn file(name: &str, content: &str) -> Node {
        Node {
            name: String::from(name),
            kind: NodeKind::File {
                content: String::from(content),
            },
            permissions: FileMode::FILE_DEFAULT,
            owner: String::from(DEFAULT_OWNER),
            group: String::from(DEFAULT_GROUP),
            modified: Utc::now(),
        }
    }

    /// New empty directory with default mode, owner, and group.
    pub fn dir(name: &str) -> Node {
        Node {
            name: String::from(name),
            kind: NodeKind::Directory {
                children: IndexMap::new(),
            },
            permissions: FileMode::DIR_DEFAULT,
            owner: String::from(DEFAULT_OWNER),
            group: String::from(DEFAULT_GROUP),
            modified: Utc::now(),
        }
    }

    /// Builder-style owner/group override, used when seeding system paths.
    pub fn owned_by(mut self, owner: &str, group: &str) -> Node {
        self.owner = String::from(owner);
        self.group = String::from(group);
        self
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Content length for files, the nominal block size for directories.
    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::File { content } => content.len(),
            NodeKind::Directory { .. } => DIR_SIZE,
        }
    }

    pub fn children(&self) -> Option<&IndexMap<String, Node>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut IndexMap<String, Node>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    /// Insert a child under its own name. No-op on files.
    pub fn insert_child(&mut self, child: Node) {
        if let NodeKind::Directory { children } = &mut self.kind {
            children.insert(child.name.clone(), child);
        }
    }
}
