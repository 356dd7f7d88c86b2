use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, ensure};
use tracing::{debug, trace, warn};

use crate::ext::{PathExt, entry_name};
use crate::filesystem::error::{
    AccessSnafu, BuildError, CancelledSnafu, NotADirectorySnafu, NotFoundSnafu, PermissionSnafu,
};
use crate::filesystem::{
    BuildOptions, BuildWarning, CancellationToken, DirectoryNode, EntryOrder, OnError, WarningKind,
};

/// Counters collected while building a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
}

impl BuildStats {
    pub(crate) fn absorb(&mut self, other: BuildStats) {
        self.directories += other.directories;
        self.files += other.files;
        self.skipped += other.skipped;
    }
}

/// A subtree built apart from its parent. `node` is `None` when the
/// directory itself was skipped.
#[derive(Debug)]
pub(crate) struct Subtree {
    pub(crate) node: Option<DirectoryNode>,
    pub(crate) warnings: Vec<BuildWarning>,
    pub(crate) stats: BuildStats,
}

/// Entries of a directory, plus the errors met reading individual entries.
pub(crate) type Listing = (Vec<DirEntry>, Vec<io::Error>);

#[derive(Debug)]
pub struct BuildOutput {
    pub tree: DirectoryNode,
    pub warnings: Vec<BuildWarning>,
    pub stats: BuildStats,
}

/// How a directory entry takes part in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    File,
    Directory,
    /// A symbolic link that is not followed.
    Link,
    /// A followed symbolic link that does not resolve: its target is
    /// missing or the chain of links loops.
    BrokenLink,
    /// Sockets, devices, FIFOs.
    Special,
}

/// Sequential, depth-first tree builder.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    options: BuildOptions,
    token: CancellationToken,
}

impl TreeBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn build(&self, root: impl AsRef<Path>) -> Result<BuildOutput, BuildError> {
        let root = root.as_ref();
        debug!("Building tree for {}", root.best_effort_display());

        let ancestors = self.open_root(root)?;
        let (entries, unreadable) = self.list_root(root)?;

        let mut walk = Walk::new(self, ancestors);
        walk.recover_all(root, unreadable)?;
        let mut node = DirectoryNode::new(root.base_name(), root.to_path_buf());
        walk.stats.directories += 1;
        walk.fill(&mut node, entries)?;

        debug!(
            "Built tree for {}: {} files in {} directories",
            root.display(),
            node.file_count(),
            walk.stats.directories
        );
        Ok(BuildOutput {
            tree: node,
            warnings: walk.warnings,
            stats: walk.stats,
        })
    }

    /// Checks that `root` is an existing directory and returns the initial
    /// cycle-guard stack for a walk starting there.
    pub(crate) fn open_root(&self, root: &Path) -> Result<Vec<PathBuf>, BuildError> {
        let metadata = match fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return NotFoundSnafu { path: root }.fail();
            }
            Err(e) => return Err(e).context(AccessSnafu { path: root }),
        };
        ensure!(metadata.is_dir(), NotADirectorySnafu { path: root });

        if !self.options.follow_symlinks {
            return Ok(Vec::new());
        }
        let canonical = root.canonicalize().context(AccessSnafu { path: root })?;
        Ok(vec![canonical])
    }

    /// Lists the root directory. Failing to list the root is fatal whatever
    /// the error policy.
    pub(crate) fn list_root(&self, root: &Path) -> Result<Listing, BuildError> {
        self.checkpoint()?;
        read_entries(root, self.options.order).context(AccessSnafu { path: root })
    }

    /// Builds the subtree rooted at `path` as a child of a walk whose
    /// current path is `ancestors`. Used to hand subtrees to worker threads.
    pub(crate) fn build_subtree(
        &self,
        path: PathBuf,
        name: String,
        ancestors: Vec<PathBuf>,
    ) -> Result<Subtree, BuildError> {
        let mut walk = Walk::new(self, ancestors);
        let node = walk.visit_directory(path, name)?;
        Ok(Subtree {
            node,
            warnings: walk.warnings,
            stats: walk.stats,
        })
    }

    pub(crate) fn classify(&self, entry: &DirEntry) -> io::Result<EntryKind> {
        let file_type = entry.file_type()?;
        if !file_type.is_symlink() {
            return Ok(kind_of(&file_type));
        }
        if !self.options.follow_symlinks {
            return Ok(EntryKind::Link);
        }

        // The link itself was listed, so only a denied lookup makes it
        // unreadable. Any other failure to resolve it means it is broken.
        match fs::metadata(entry.path()) {
            Ok(metadata) => Ok(kind_of(&metadata.file_type())),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(e),
            Err(_) => Ok(EntryKind::BrokenLink),
        }
    }

    pub(crate) fn checkpoint(&self) -> Result<(), BuildError> {
        ensure!(!self.token.is_cancelled(), CancelledSnafu);
        Ok(())
    }
}

fn kind_of(file_type: &fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_symlink() {
        EntryKind::Link
    } else {
        EntryKind::Special
    }
}

/// Lists `dir`. The outer error means the directory itself could not be
/// opened; entries that failed to be read are returned alongside.
fn read_entries(dir: &Path, order: EntryOrder) -> io::Result<Listing> {
    let mut entries = Vec::new();
    let mut unreadable = Vec::new();
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) => unreadable.push(e),
        }
    }

    if order == EntryOrder::Name {
        entries.sort_by_key(DirEntry::file_name);
    }
    Ok((entries, unreadable))
}

/// State of one depth-first walk. Owned by a single thread.
pub(crate) struct Walk<'a> {
    builder: &'a TreeBuilder,
    /// Canonical paths of the directories on the current path. Only
    /// maintained when links are followed.
    ancestors: Vec<PathBuf>,
    pub(crate) warnings: Vec<BuildWarning>,
    pub(crate) stats: BuildStats,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(builder: &'a TreeBuilder, ancestors: Vec<PathBuf>) -> Self {
        Self {
            builder,
            ancestors,
            warnings: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// Fills `node` from the already listed `entries` of its directory.
    pub(crate) fn fill(
        &mut self,
        node: &mut DirectoryNode,
        entries: Vec<DirEntry>,
    ) -> Result<(), BuildError> {
        for entry in entries {
            self.builder.checkpoint()?;
            let path = entry.path();

            let kind = match self.builder.classify(&entry) {
                Ok(kind) => kind,
                Err(e) => {
                    self.recover(path, WarningKind::UnreadableEntry, e)?;
                    continue;
                }
            };
            trace!("{} is {:?}", path.display(), kind);

            match kind {
                EntryKind::File => {
                    self.stats.files += 1;
                    node.push_file(path);
                }
                EntryKind::Directory => {
                    let name = entry_name(&entry.file_name());
                    if let Some(child) = self.visit_directory(path, name)? {
                        self.attach(node, child);
                    }
                }
                EntryKind::Link | EntryKind::BrokenLink | EntryKind::Special => {
                    debug!("Skipping {:?} entry {}", kind, path.display());
                    self.stats.skipped += 1;
                }
            }
        }
        Ok(())
    }

    /// Builds the node for the directory at `path`. `None` means the
    /// directory was skipped and a warning recorded.
    pub(crate) fn visit_directory(
        &mut self,
        path: PathBuf,
        name: String,
    ) -> Result<Option<DirectoryNode>, BuildError> {
        self.builder.checkpoint()?;

        let guarded = self.builder.options.follow_symlinks;
        if guarded {
            let canonical = match path.canonicalize() {
                Ok(canonical) => canonical,
                Err(e) => {
                    self.recover(path, WarningKind::UnreadableEntry, e)?;
                    return Ok(None);
                }
            };
            if self.ancestors.contains(&canonical) {
                let message = format!("links back to {}", canonical.display());
                warn!("Not following {}: {}", path.display(), message);
                self.warnings.push(BuildWarning::new(path, WarningKind::SymlinkCycle, message));
                self.stats.skipped += 1;
                return Ok(None);
            }
            self.ancestors.push(canonical);
        }

        let result = self.list_and_fill(path, name);
        if guarded {
            self.ancestors.pop();
        }
        result
    }

    fn list_and_fill(
        &mut self,
        path: PathBuf,
        name: String,
    ) -> Result<Option<DirectoryNode>, BuildError> {
        debug!("Visiting {}", path.display());
        let (entries, unreadable) = match read_entries(&path, self.builder.options.order) {
            Ok(listing) => listing,
            Err(e) => {
                self.recover(path, WarningKind::UnlistableDirectory, e)?;
                return Ok(None);
            }
        };
        self.recover_all(&path, unreadable)?;

        let mut node = DirectoryNode::new(name, path);
        self.stats.directories += 1;
        self.fill(&mut node, entries)?;
        Ok(Some(node))
    }

    pub(crate) fn attach(&mut self, parent: &mut DirectoryNode, child: DirectoryNode) {
        let name = child.name().to_owned();
        let path = child.path().to_path_buf();
        if let Some(stored) = parent.adopt_child(child) {
            let message = format!("name '{name}' is already taken, stored as '{stored}'");
            warn!("Renaming {}: {}", path.display(), message);
            self.warnings.push(BuildWarning::new(path, WarningKind::DuplicateName, message));
        }
    }

    /// Applies the error policy to entries of `dir` that could not be read.
    pub(crate) fn recover_all(
        &mut self,
        dir: &Path,
        errors: Vec<io::Error>,
    ) -> Result<(), BuildError> {
        for error in errors {
            self.recover(dir.to_path_buf(), WarningKind::UnreadableEntry, error)?;
        }
        Ok(())
    }

    /// Applies the error policy to a per-entry failure.
    fn recover(
        &mut self,
        path: PathBuf,
        kind: WarningKind,
        error: io::Error,
    ) -> Result<(), BuildError> {
        if self.builder.options.on_error == OnError::Abort {
            return Err(error).context(PermissionSnafu { path });
        }
        warn!("Skipping {}: {}", path.display(), error);
        self.warnings.push(BuildWarning::new(path, kind, error.to_string()));
        self.stats.skipped += 1;
        Ok(())
    }
}
