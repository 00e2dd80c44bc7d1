//! `prefctl` configuration.
//!
//! Read from `--config <path>` or `<config dir>/prefsync/config.json`. A
//! missing file means defaults; command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CliError;

fn default_prefix() -> String {
    "app-".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Connection settings for the remote preference API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// API root, e.g. `https://api.example.com/user/`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_prefix")]
    pub prefix: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            prefix: default_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Returns the path to the default config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("prefsync").join("config.json"))
}

impl SyncConfig {
    /// Load the config at `path`, or at [`default_config_path`] when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(CliError::Io { path, source }),
        };

        serde_json::from_str(&contents).map_err(|source| CliError::InvalidConfig { path, source })
    }

    /// Replace file values with those given on the command line.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        token: Option<String>,
        prefix: Option<String>,
    ) -> Self {
        if base_url.is_some() {
            self.base_url = base_url;
        }
        if token.is_some() {
            self.token = token;
        }
        if let Some(prefix) = prefix {
            self.prefix = prefix;
        }
        self
    }

    pub fn base_url(&self) -> Result<&str, CliError> {
        self.base_url.as_deref().ok_or(CliError::MissingBaseUrl)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
