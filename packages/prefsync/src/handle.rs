//! Per-key reactive preference values.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use prefsync_core::{Observable, Snapshot, Subscription};

use crate::sync::{UploadOutcome, Uploader};
use crate::SyncError;

/// Where a handle stands relative to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Edited while no upload was possible (logged out, or no remote).
    UnsyncedLocal,
    /// Differs from the remote; an upload was attempted or is due.
    PendingUpload,
    /// Matches the last value confirmed by the remote store.
    Synced,
}

#[derive(Debug)]
struct Meta {
    /// Last value seen in the snapshot or confirmed by an upload.
    synced: Option<String>,
    state: SyncState,
    /// Version of the newest snapshot observed.
    seen_version: u64,
}

struct HandleInner {
    key: String,
    value: Observable<Option<String>>,
    meta: RefCell<Meta>,
    uploader: Option<Weak<dyn Uploader>>,
}

/// Reactive accessor for one preference.
///
/// Handles are obtained from [`Preferences`](crate::Preferences), which keeps
/// exactly one per key. Clones share the same value.
///
/// An unset preference reads as `None`. Setting a preference to the empty
/// string or calling [`clear`](Self::clear) removes it remotely.
#[derive(Clone)]
pub struct PreferenceHandle {
    inner: Rc<HandleInner>,
}

impl fmt::Debug for PreferenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceHandle")
            .field("key", &self.inner.key)
            .field("value", &self.inner.value.get())
            .field("state", &self.inner.meta.borrow().state)
            .finish()
    }
}

fn normalized(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl PreferenceHandle {
    pub(crate) fn new(
        key: String,
        synced: Option<String>,
        default: Option<&str>,
        uploader: Option<Weak<dyn Uploader>>,
    ) -> Self {
        let state = if synced.is_some() {
            SyncState::Synced
        } else {
            SyncState::UnsyncedLocal
        };
        let value = synced.clone().or_else(|| default.map(str::to_string));

        Self {
            inner: Rc::new(HandleInner {
                key,
                value: Observable::new(value),
                meta: RefCell::new(Meta {
                    synced,
                    state,
                    seen_version: 0,
                }),
                uploader,
            }),
        }
    }

    /// The sanitized key.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn get(&self) -> Option<String> {
        self.inner.value.get()
    }

    pub fn sync_state(&self) -> SyncState {
        self.inner.meta.borrow().state
    }

    /// The last value known to be stored remotely.
    pub fn last_synced(&self) -> Option<String> {
        self.inner.meta.borrow().synced.clone()
    }

    /// Set the value locally and push it to the remote store.
    ///
    /// A failed upload keeps the local value and leaves the handle
    /// [`PendingUpload`](SyncState::PendingUpload); use
    /// [`try_set`](Self::try_set) to get the error.
    pub fn set(&self, value: impl Into<String>) {
        if self.update(Some(value.into())).is_err() {
            log::debug!("Preference {} kept locally until the next sync", self.inner.key);
        }
    }

    /// Unset the value locally and remove it from the remote store.
    pub fn clear(&self) {
        if self.update(None).is_err() {
            log::debug!("Removal of {} kept locally until the next sync", self.inner.key);
        }
    }

    /// Like [`set`](Self::set), but reports a failed upload.
    ///
    /// Being logged out is not an error: the value stays local and is
    /// uploaded on the next sync.
    pub fn try_set(&self, value: impl Into<String>) -> Result<(), SyncError> {
        self.update(Some(value.into()))
    }

    /// Like [`clear`](Self::clear), but reports a failed removal.
    pub fn try_clear(&self) -> Result<(), SyncError> {
        self.update(None)
    }

    /// Run `callback` whenever the value changes, whatever the cause.
    pub fn subscribe(&self, callback: impl Fn(&Option<String>) + 'static) -> Subscription {
        self.inner.value.subscribe(callback)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.inner.value.unsubscribe(subscription)
    }

    fn update(&self, value: Option<String>) -> Result<(), SyncError> {
        let changed = self.inner.value.set(value.clone());
        if !changed && self.sync_state() == SyncState::Synced {
            return Ok(());
        }

        if normalized(value.as_deref()) == self.last_synced().as_deref() {
            self.inner.meta.borrow_mut().state = SyncState::Synced;
            return Ok(());
        }

        let uploader = self.inner.uploader.as_ref().and_then(Weak::upgrade);
        let Some(uploader) = uploader else {
            self.inner.meta.borrow_mut().state = SyncState::UnsyncedLocal;
            return Ok(());
        };

        self.inner.meta.borrow_mut().state = SyncState::PendingUpload;
        let result = uploader.upload(&self.inner.key, value.as_deref());
        self.record_outcome(&result, value.as_deref());
        result.map(|_| ())
    }

    /// Follow the snapshot if the value stored for this key changed since it
    /// was last seen. Pending local edits survive unrelated notifications.
    ///
    /// A snapshot older than one already observed is ignored. That happens
    /// when a subscriber writes to the store while an earlier notification
    /// is still being delivered.
    pub(crate) fn observe(&self, snapshot: &Snapshot) {
        let remote = snapshot.get(&self.inner.key);

        let adopt = {
            let mut meta = self.inner.meta.borrow_mut();
            if snapshot.version() < meta.seen_version {
                return;
            }
            meta.seen_version = snapshot.version();
            if meta.synced.as_deref() == remote {
                return;
            }
            let previous = meta.synced.take();
            meta.synced = remote.map(str::to_string);

            match remote {
                Some(_) => {
                    meta.state = SyncState::Synced;
                    true
                }
                None => {
                    // Removed from the snapshot: follow unless edited locally.
                    let current = self.inner.value.get();
                    if normalized(current.as_deref()) == previous.as_deref() {
                        meta.state = SyncState::Synced;
                        true
                    } else {
                        false
                    }
                }
            }
        };

        if adopt {
            self.inner.value.set(remote.map(str::to_string));
        }
    }

    /// Take the remote value, overriding any local edit.
    pub(crate) fn adopt_remote(&self, value: &str) {
        {
            let mut meta = self.inner.meta.borrow_mut();
            meta.synced = Some(value.to_string());
            meta.state = SyncState::Synced;
        }
        self.inner.value.set(Some(value.to_string()));
    }

    pub(crate) fn mark(&self, state: SyncState) {
        self.inner.meta.borrow_mut().state = state;
    }

    pub(crate) fn record_outcome(
        &self,
        result: &Result<UploadOutcome, SyncError>,
        value: Option<&str>,
    ) {
        let mut meta = self.inner.meta.borrow_mut();
        match result {
            Ok(UploadOutcome::Offline) => meta.state = SyncState::UnsyncedLocal,
            Ok(_) => {
                meta.synced = normalized(value).map(str::to_string);
                meta.state = SyncState::Synced;
            }
            Err(_) => meta.state = SyncState::PendingUpload,
        }
    }
}
