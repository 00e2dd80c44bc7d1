//! # prefsync
//!
//! Reactive user preferences backed by a remote key/value store that only
//! holds values of up to 255 bytes under keys shorter than 255 bytes.
//!
//! The pieces, from the bottom up:
//!
//! - [`Session`]: login state; every remote operation is gated on it
//! - [`PreferenceHandle`]: one reactive preference, obtained from the
//!   [`Preferences`] registry, that pushes local edits upstream
//! - [`LongPreference`]: a value of any length spread over several slots
//! - [`RemoteSync`]: fetch, upload and delete, plus reconciliation of a fetched
//!   listing with the local handles
//! - [`PreferenceSync`]: all of the above wired together for one user
//!
//! Everything here is single-threaded. Remote calls block the caller.

mod client;
mod error;
mod handle;
pub mod long;
mod registry;
mod session;
mod sync;

pub use client::PreferenceSync;
pub use error::SyncError;
pub use handle::{PreferenceHandle, SyncState};
pub use long::LongPreference;
pub use registry::Preferences;
pub use session::Session;
pub use sync::{ReconcileReport, RemoteSync, UploadOutcome, Uploader};

pub use prefsync_core::{ConfigError, PreferenceStore};
