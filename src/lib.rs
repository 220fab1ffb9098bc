//! vshell: virtual filesystem and shell pipeline engine.
//!
//! An in-memory, tree-structured filesystem with POSIX-like path semantics
//! and permission bits, plus a command-pipeline executor supporting piping
//! and I/O redirection. This is the engine behind a browser-based learning
//! terminal: the UI layer feeds a raw command line and the current
//! filesystem snapshot in, and gets a `(stdout, stderr, new snapshot)`
//! triple back to render and persist.
//!
//! Nothing here touches a real filesystem or spawns processes. It is a
//! pedagogical simulation of a subset of shell and filesystem behavior:
//! permission bits are stored and rendered but never enforced, and the
//! "administrative" commands only print what the real ones would confirm.
//!
//! ```
//! use vshell::prelude::*;
//!
//! let registry = CommandRegistry::builtin();
//! let vfs = Vfs::seed();
//!
//! let out = execute("echo \"hello\" > greeting", &vfs, &registry);
//! let out = execute("cat greeting", &out.vfs, &registry);
//! assert_eq!(out.stdout, "hello\n");
//! ```
//!
//! Every call deep-copies the snapshot it is given and returns a new one;
//! the caller re-binds to the returned value. A failing command line
//! returns the original snapshot untouched.

pub mod commands;
pub mod error;
pub mod fs;
pub mod glob;
pub mod mode;
pub mod node;
pub mod path;
pub mod pipeline;

pub use commands::{CommandOutput, CommandRegistry, Handler};
pub use error::VfsError;
pub use fs::{ListEntry, ListOptions, Vfs};
pub use mode::FileMode;
pub use node::{Node, NodeKind};
pub use pipeline::{execute, ExecOutcome};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        execute, CommandOutput, CommandRegistry, ExecOutcome, FileMode, ListEntry, ListOptions,
        Node, NodeKind, Vfs, VfsError,
    };
}
