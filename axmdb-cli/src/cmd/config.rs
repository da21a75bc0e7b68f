//! Configuration file loading.

use std::fs;
use std::path::{Path, PathBuf};

use axmdb::ProviderConfig;
use serde::Deserialize;

use super::CliError;

/// Source used when neither the command line nor the file names one.
pub const DEFAULT_SOURCE: &str = "1";

/// Default config file location: `<config_dir>/axmdb/axmdb.toml`.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("axmdb")
        .join("axmdb.toml")
}

/// Settings read from `axmdb.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Default source (video channel) to subscribe to.
    pub source: Option<String>,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    /// Provider channel sizes.
    pub provider: ProviderConfig,
}

impl CliConfig {
    /// Load from `path`, or from [`default_path`] when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_path(), false),
        };
        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text).map_err(|e| CliError::Config {
                path: path.clone(),
                message: e.to_string(),
            }),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(CliError::Io { path, source }),
        }
    }

    /// Parse TOML text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// `flag`, else the configured source, else [`DEFAULT_SOURCE`].
    pub fn source_or(&self, flag: Option<&str>) -> String {
        flag.or(self.source.as_deref())
            .unwrap_or(DEFAULT_SOURCE)
            .to_owned()
    }
}
