//! Recursive directory trees in which every directory knows the full set of
//! files beneath it.
//!
//! ```no_run
//! let tree = pathtree::build_tree("some/dir")?;
//! for file in tree.files() {
//!     println!("{}", file.display());
//! }
//! # Ok::<(), pathtree::BuildError>(())
//! ```

#![allow(clippy::enum_variant_names)]
#![allow(clippy::module_inception)]

pub mod application;
pub mod cli;
pub mod config;
pub mod executor;
pub mod ext;
pub mod filesystem;
pub mod render;

pub use filesystem::{
    BuildError, BuildOptions, BuildOutput, BuildWarning, CancellationToken, DirectoryNode,
    EntryOrder, OnError, TreeBuilder, build_tree,
};
