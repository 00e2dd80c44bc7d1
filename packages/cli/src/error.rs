use std::path::PathBuf;

use prefsync::{ConfigError, SyncError};

/// Errors surfaced by `prefctl`.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no base URL configured (use --base-url or set base_url in the config file)")]
    MissingBaseUrl,

    #[error(transparent)]
    Http(#[from] prefsync_http::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
