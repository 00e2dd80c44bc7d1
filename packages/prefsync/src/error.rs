use prefsync_core::ConfigError;

/// Errors from synchronizing with the remote preference store.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    /// A remote operation was requested while logged out.
    #[error("not logged in")]
    NotLoggedIn,

    /// The request could not be completed. Local state is unchanged.
    #[error("network error: {0}")]
    Network(#[from] prefsync_http::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
