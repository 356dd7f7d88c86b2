//! In-memory snapshot of a directory hierarchy.
//!
//! Every [`DirectoryNode`] carries the closure of the files beneath it, not
//! only its immediate entries, along with a map of its subdirectories.
//! [`TreeBuilder`] produces such trees in a single depth-first pass.

mod builder;
mod cancel;
mod error;
mod options;
mod tree;
mod warning;

use std::path::Path;

pub use builder::{BuildOutput, BuildStats, TreeBuilder};
pub(crate) use builder::{EntryKind, Subtree, Walk};
pub use cancel::CancellationToken;
pub use error::BuildError;
pub use options::{BuildOptions, EntryOrder, OnError};
pub use tree::{DirectoryNode, Nodes};
pub use warning::{BuildWarning, WarningKind};

/// Builds the tree under `path` with default options: links are not
/// followed and unreadable entries are skipped.
pub fn build_tree(path: impl AsRef<Path>) -> Result<DirectoryNode, BuildError> {
    TreeBuilder::default().build(path).map(|output| output.tree)
}
