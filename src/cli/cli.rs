use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::application::data::{ColorChoice, LogLevel};
use crate::filesystem::{EntryOrder, OnError};

/// Print a directory tree where every directory lists all files beneath it.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// The directory to build the tree for
    #[clap(default_value = ".")]
    pub path: PathBuf,

    /// Follow symbolic links instead of skipping them
    #[clap(long)]
    pub follow_symlinks: bool,

    /// What to do with entries that cannot be read [default: skip]
    #[clap(long, value_enum)]
    pub on_error: Option<OnError>,

    /// Order in which directory entries are visited [default: listing]
    #[clap(long, value_enum)]
    pub order: Option<EntryOrder>,

    /// List every file under each directory, not only its direct files
    #[clap(long)]
    pub all_files: bool,

    /// Number of worker threads [default: available parallelism]
    #[clap(long, short)]
    pub jobs: Option<NonZeroUsize>,

    /// Cancel the build after this many seconds
    #[clap(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// YAML file with build defaults
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[clap(long, default_value = "auto", value_enum)]
    pub color: ColorChoice,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}
