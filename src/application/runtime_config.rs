use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::config::FileConfig;
use crate::filesystem::BuildOptions;
use crate::render::FileListing;

/// Settings for one run, after layering command line flags over the config
/// file over built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub root: PathBuf,
    pub build_options: BuildOptions,
    pub listing: FileListing,
    /// `None` means one worker per available CPU.
    pub jobs: Option<NonZeroUsize>,
    pub timeout: Option<Duration>,
    pub color: bool,
}

impl RuntimeConfig {
    pub fn resolve(cli: Cli, file: FileConfig) -> Self {
        let build_options = BuildOptions::default()
            .follow_symlinks(cli.follow_symlinks || file.follow_symlinks.unwrap_or(false))
            .on_error(cli.on_error.or(file.on_error).unwrap_or_default())
            .order(cli.order.or(file.order).unwrap_or_default());

        let listing = if cli.all_files || file.all_files.unwrap_or(false) {
            FileListing::Closure
        } else {
            FileListing::Direct
        };

        Self {
            root: cli.path,
            build_options,
            listing,
            jobs: cli.jobs.or(file.jobs),
            timeout: cli.timeout.map(Duration::from_secs),
            color: cli.color.enabled(),
        }
    }
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self::resolve(cli, FileConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::filesystem::{EntryOrder, OnError};

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pathtree").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn defaults_without_flags_or_file() {
        let config: RuntimeConfig = cli(&["--color=never"]).into();

        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.build_options, BuildOptions::default());
        assert_eq!(config.listing, FileListing::Direct);
        assert_eq!(config.jobs, None);
        assert_eq!(config.timeout, None);
        assert!(!config.color);
    }

    #[test]
    fn file_fills_in_unset_flags() {
        let file = FileConfig {
            follow_symlinks: Some(true),
            on_error: Some(OnError::Abort),
            order: Some(EntryOrder::Name),
            all_files: Some(true),
            jobs: NonZeroUsize::new(2),
        };

        let config = RuntimeConfig::resolve(cli(&["--color=never"]), file);

        assert!(config.build_options.follow_symlinks);
        assert_eq!(config.build_options.on_error, OnError::Abort);
        assert_eq!(config.build_options.order, EntryOrder::Name);
        assert_eq!(config.listing, FileListing::Closure);
        assert_eq!(config.jobs, NonZeroUsize::new(2));
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            on_error: Some(OnError::Abort),
            order: Some(EntryOrder::Name),
            jobs: NonZeroUsize::new(2),
            ..FileConfig::default()
        };

        let config = RuntimeConfig::resolve(
            cli(&[
                "--on-error=skip",
                "--order=listing",
                "-j",
                "7",
                "--timeout",
                "5",
                "--color=always",
            ]),
            file,
        );

        assert_eq!(config.build_options.on_error, OnError::Skip);
        assert_eq!(config.build_options.order, EntryOrder::Listing);
        assert_eq!(config.jobs, NonZeroUsize::new(7));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(config.color);
    }
}
