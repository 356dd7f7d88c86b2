use std::path::PathBuf;

use snafu::Snafu;

use crate::ext::PathExt;

/// Fatal failures of a tree build. No partial tree accompanies any of them.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BuildError {
    #[snafu(display("Path {} does not exist", path.best_effort_display()))]
    NotFoundError { path: PathBuf },
    #[snafu(display("Path {} is not a directory", path.best_effort_display()))]
    NotADirectoryError { path: PathBuf },
    #[snafu(display("Cannot access root directory {}", path.best_effort_display()))]
    AccessError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Cannot read entry {}", path.best_effort_display()))]
    PermissionError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Tree build was cancelled"))]
    CancelledError,
}

impl BuildError {
    /// The path the failure refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            BuildError::NotFoundError { path }
            | BuildError::NotADirectoryError { path }
            | BuildError::AccessError { path, .. }
            | BuildError::PermissionError { path, .. } => Some(path),
            BuildError::CancelledError => None,
        }
    }
}
