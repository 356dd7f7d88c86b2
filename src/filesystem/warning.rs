use std::path::PathBuf;

use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WarningKind {
    #[display("unreadable entry")]
    UnreadableEntry,
    #[display("unlistable directory")]
    UnlistableDirectory,
    #[display("symlink cycle")]
    SymlinkCycle,
    #[display("duplicate name")]
    DuplicateName,
}

/// A recoverable problem met during a build. The offending entry is absent
/// from the resulting tree, except for a [`WarningKind::DuplicateName`],
/// which is stored under a suffixed name.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{kind} at {}: {message}", path.display())]
pub struct BuildWarning {
    pub path: PathBuf,
    pub kind: WarningKind,
    pub message: String,
}

impl BuildWarning {
    pub fn new(path: impl Into<PathBuf>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}
