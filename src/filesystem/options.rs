use clap::ValueEnum;
use derive_more::Display;

/// What to do when an entry below the root cannot be classified or listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display)]
pub enum OnError {
    /// Leave the entry out of the tree and record a warning.
    #[default]
    #[display("skip")]
    Skip,
    /// Fail the whole build.
    #[display("abort")]
    Abort,
}

/// Order in which the entries of a directory are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display)]
pub enum EntryOrder {
    /// Whatever order the operating system lists them in.
    #[default]
    #[display("listing")]
    Listing,
    /// Sorted by file name, byte-wise.
    #[display("name")]
    Name,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Classify symbolic links by their target. Off by default: links are
    /// opaque leaves and never descended into.
    pub follow_symlinks: bool,
    pub on_error: OnError,
    pub order: EntryOrder,
}

impl BuildOptions {
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn order(mut self, order: EntryOrder) -> Self {
        self.order = order;
        self
    }
}
