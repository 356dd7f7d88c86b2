use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use std::{borrow::Cow, num::NonZeroUsize, path::Path};
use tracing::debug;

use crate::{
    ext::PathExt,
    filesystem::{EntryOrder, OnError},
};

const FOLLOW_SYMLINKS_KEY: &str = "followSymlinks";
const ON_ERROR_KEY: &str = "onError";
const ORDER_KEY: &str = "order";
const ALL_FILES_KEY: &str = "allFiles";
const JOBS_KEY: &str = "jobs";

const KNOWN_KEYS: [&str; 5] = [
    FOLLOW_SYMLINKS_KEY,
    ON_ERROR_KEY,
    ORDER_KEY,
    ALL_FILES_KEY,
    JOBS_KEY,
];

/// Build defaults read from a YAML file. Every field is optional; unset
/// fields fall back to command line flags or built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub follow_symlinks: Option<bool>,
    pub on_error: Option<OnError>,
    pub order: Option<EntryOrder>,
    pub all_files: Option<bool>,
    pub jobs: Option<NonZeroUsize>,
}

impl FileConfig {
    pub async fn read(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading config file: {}", path.best_effort_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_display(),
        })?;
        debug!("Successfully read config file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_display(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_mapping(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Self, ConfigError> {
        for key in top_level.keys() {
            match key.as_str() {
                Some(name) if KNOWN_KEYS.contains(&name) => {}
                _ => debug!("Ignoring unknown config key: {:?}", key),
            }
        }

        Ok(FileConfig {
            follow_symlinks: Self::bool_value(top_level, FOLLOW_SYMLINKS_KEY)?,
            on_error: Self::choice_value(top_level, ON_ERROR_KEY, |s| match s {
                "skip" => Some(OnError::Skip),
                "abort" => Some(OnError::Abort),
                _ => None,
            })?,
            order: Self::choice_value(top_level, ORDER_KEY, |s| match s {
                "listing" => Some(EntryOrder::Listing),
                "name" => Some(EntryOrder::Name),
                _ => None,
            })?,
            all_files: Self::bool_value(top_level, ALL_FILES_KEY)?,
            jobs: Self::jobs_value(top_level)?,
        })
    }

    fn lookup<'a, 'b>(
        top_level: &'a LinkedHashMap<Yaml<'b>, Yaml<'b>>,
        key: &'static str,
    ) -> Option<&'a Yaml<'b>> {
        top_level
            .get(&Yaml::Value(Scalar::String(Cow::Borrowed(key))))
            .filter(|value| !value.is_null())
    }

    fn bool_value(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
    ) -> Result<Option<bool>, ConfigError> {
        Self::lookup(top_level, key)
            .map(|value| {
                value.as_bool().ok_or_else(|| ConfigError::InvalidValue {
                    key,
                    expected: "a boolean",
                })
            })
            .transpose()
    }

    fn choice_value<T>(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ConfigError> {
        Self::lookup(top_level, key)
            .map(|value| {
                value.as_str().and_then(&parse).ok_or_else(|| ConfigError::InvalidValue {
                    key,
                    expected: "one of the documented values",
                })
            })
            .transpose()
    }

    fn jobs_value(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Option<NonZeroUsize>, ConfigError> {
        Self::lookup(top_level, JOBS_KEY)
            .map(|value| {
                value
                    .as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .and_then(NonZeroUsize::new)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: JOBS_KEY,
                        expected: "a positive integer",
                    })
            })
            .transpose()
    }
}

impl TryFrom<&str> for FileConfig {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            // An empty file configures nothing.
            return Ok(FileConfig::default());
        };

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;
        Self::parse_mapping(top_level)
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{}' should be {}", key, expected))]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[compio::test]
    async fn config_returns_error_on_nonexistent_file() {
        let result = FileConfig::read(Path::new("nonexistent.yaml")).await;
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[compio::test]
    async fn config_reads_file_from_disk() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("pathtree.yaml");
        std::fs::write(&path, "followSymlinks: true\njobs: 4\n").expect("Failed to write config");

        let config = FileConfig::read(&path).await.expect("config should parse");

        assert_eq!(config.follow_symlinks, Some(true));
        assert_eq!(config.jobs, NonZeroUsize::new(4));
        assert_eq!(config.on_error, None);
    }

    #[test]
    fn config_parses_every_key() {
        let yaml = r#"
followSymlinks: false
onError: abort
order: name
allFiles: true
jobs: 2
"#;
        let config: FileConfig = yaml.try_into().expect("config should parse");
        assert_eq!(
            config,
            FileConfig {
                follow_symlinks: Some(false),
                on_error: Some(OnError::Abort),
                order: Some(EntryOrder::Name),
                all_files: Some(true),
                jobs: NonZeroUsize::new(2),
            }
        );
    }

    #[test]
    fn config_handles_empty_file() {
        let config: FileConfig = "".try_into().expect("empty config should parse");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn config_ignores_unknown_keys_and_nulls() {
        let yaml = "somethingElse: 3\nonError: null\n";
        let config: FileConfig = yaml.try_into().expect("config should parse");
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn config_returns_error_on_invalid_yaml() {
        let result: Result<FileConfig, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[rstest]
    #[case("- item1\n- item2")]
    #[case("just a string")]
    fn config_returns_error_when_top_level_is_not_map(#[case] yaml: &str) {
        let result: Result<FileConfig, _> = yaml.try_into();
        assert!(matches!(result, Err(ConfigError::TopLevelNotMap)));
    }

    #[rstest]
    #[case("followSymlinks: maybe", FOLLOW_SYMLINKS_KEY)]
    #[case("onError: retry", ON_ERROR_KEY)]
    #[case("order: random", ORDER_KEY)]
    #[case("jobs: 0", JOBS_KEY)]
    #[case("jobs: -3", JOBS_KEY)]
    #[case("jobs: many", JOBS_KEY)]
    fn config_rejects_invalid_values(#[case] yaml: &str, #[case] bad_key: &str) {
        let result: Result<FileConfig, _> = yaml.try_into();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key, .. }) if key == bad_key
        ));
    }
}
