use crate::backend::SearchOptions;
use crate::query::{ParserOptions, SearchType};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "searchq";
const CONFIG_FILE: &str = "config.toml";

/// Settings read from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub backend: BackendConfig,
    pub search: SearchOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub pattern_type: SearchType,
    pub globbing: bool,
}

impl ParserConfig {
    pub fn options(&self) -> ParserOptions {
        ParserOptions {
            search_type: self.pattern_type,
            globbing: self.globbing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// `host:port` or `scheme://host:port`
    #[serde(default = "default_address")]
    pub address: String,

    /// Upper bound for one-shot searches
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Events buffered between a producer and the consumer
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Use the backend's native stream instead of wrapping one-shot searches
    #[serde(default = "default_streaming")]
    pub streaming: bool,
}

fn default_address() -> String {
    "localhost:6070".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_event_buffer() -> usize {
    16
}

fn default_streaming() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            event_buffer: default_event_buffer(),
            streaming: default_streaming(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing file at the default location yields the defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.backend.event_buffer == 0 {
            bail!("backend.event_buffer must be at least 1");
        }
        if self.backend.address.trim().is_empty() {
            bail!("backend.address must not be empty");
        }
        Ok(())
    }
}

/// `<config dir>/searchq/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend.address, "localhost:6070");
        assert_eq!(config.backend.event_buffer, 16);
        assert!(config.backend.streaming);
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            [parser]
            pattern_type = "regexp"
            globbing = true

            [backend]
            address = "https://index.internal"
            request_timeout = "1m"
            connect_timeout = "500ms"
            event_buffer = 4
            streaming = false

            [search]
            max_wall_time = "10s"
            total_max_match_count = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.parser.options().search_type, SearchType::Regexp);
        assert!(config.parser.globbing);
        assert_eq!(config.backend.request_timeout, Duration::from_secs(60));
        assert_eq!(config.backend.connect_timeout, Duration::from_millis(500));
        assert!(!config.backend.streaming);
        assert_eq!(config.search.max_wall_time, Some(Duration::from_secs(10)));
        assert_eq!(config.search.total_max_match_count, 500);
    }

    #[test]
    fn test_regex_alias() {
        let config = Config::from_toml("[parser]\npattern_type = \"regex\"\n").unwrap();
        assert_eq!(config.parser.pattern_type, SearchType::Regexp);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_toml("[backend]\nevent_buffer = 0\n").is_err());
        assert!(Config::from_toml("[backend]\nrequest_timeout = \"soon\"\n").is_err());
        assert!(Config::from_toml("[parser]\npattern_type = \"structural\"\n").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\naddress = \"10.0.0.1:6070\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.backend.address, "10.0.0.1:6070");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
