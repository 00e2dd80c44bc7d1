//! Error types for the core layer.

use crate::key::{MAX_CHUNKS, MAX_KEY_LENGTH};

/// Configuration errors.
///
/// These are programmer errors: a key that can never be stored remotely, or a
/// value too long to fit in the slots available to it. They are reported at
/// the call site and never retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The sanitized key (prefix included) is too long for the remote store.
    #[error("preference key '{key}' is {length} bytes long, keys must be shorter than {max}", max = MAX_KEY_LENGTH)]
    KeyTooLong { key: String, length: usize },

    /// A long value needs more slots than the hard ceiling.
    #[error("long preference '{key}' needs {chunks} slots, at most {max} are allowed", max = MAX_CHUNKS)]
    TooManyChunks { key: String, chunks: usize },
}
