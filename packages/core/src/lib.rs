//! Core prefsync types.
//!
//! This is the bottom layer of the prefsync stack. It knows nothing about the
//! network; it provides:
//!
//! - [`Observable`]: a single-threaded reactive value
//! - [`PreferenceStore`] and [`Snapshot`]: the versioned local cache of
//!   remote preferences
//! - [`sanitize_key`] and the slot constants shared by every layer above
//! - [`ConfigError`]: errors raised for keys and values the remote store could
//!   never hold
//!
//! # Example
//!
//! ```rust
//! use prefsync_core::{sanitize_key, PreferenceStore};
//!
//! let store = PreferenceStore::new();
//! let key = sanitize_key("app-", "background layer")?;
//! store.set_in_place(&key, "osm");
//!
//! assert_eq!(store.get("app-backgroundlayer").as_deref(), Some("osm"));
//! # Ok::<(), prefsync_core::ConfigError>(())
//! ```

mod error;
pub mod key;
mod observable;
mod store;

pub use error::ConfigError;
pub use key::{
    chunk_slot_key, length_slot_key, sanitize_key, MAX_CHUNKS, MAX_KEY_LENGTH, SLOT_LENGTH,
};
pub use observable::{Observable, Subscription};
pub use store::{PreferenceStore, Snapshot};
