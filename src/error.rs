//! Error taxonomy for tree and permission operations.
//!
//! Every variant renders as the coreutils phrasing a shell user would see;
//! command handlers compose these into `"<cmd>: <path>: <message>"` stderr
//! lines. Nothing in the engine panics or lets an error cross the crate
//! boundary as anything but text.

/// All errors produced by filesystem-tree and permission operations.
///
/// Command-level failures (missing operands, unknown command names) are not
/// represented here: handlers and the pipeline executor emit those directly
/// as stderr text, since they never travel through the tree layer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    /// A path segment is missing, or an intermediate segment is not a
    /// directory.
    #[error("No such file or directory")]
    PathNotFound,

    /// A directory was required but the path names a file.
    #[error("Not a directory")]
    NotADirectory,

    /// A file was required but the path names a directory.
    #[error("Is a directory")]
    NotAFile,

    /// The parent directory already has a child with that name.
    #[error("File exists")]
    AlreadyExists,

    /// Refusing to remove a directory that still has children.
    #[error("Directory not empty")]
    DirectoryNotEmpty,

    /// A permission mode string that is not 1-3 octal digits in 0..=0o777.
    #[error("invalid mode: '{0}'")]
    InvalidMode(String),

    /// A malformed glob pattern (unterminated `[...]` class).
    #[error("invalid pattern: '{0}'")]
    InvalidPattern(String),
}
