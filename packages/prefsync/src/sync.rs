//! Network round trips and reconciliation.
//!
//! [`RemoteSync`] performs the three remote operations and keeps the
//! [`PreferenceStore`] in line with their results. Local state is only changed
//! once the remote store has confirmed an operation; a failed operation is
//! logged and leaves local state as the only record until the next sync.

use std::collections::BTreeMap;

use prefsync_core::PreferenceStore;
use prefsync_http::PreferencesApi;

use crate::handle::{PreferenceHandle, SyncState};
use crate::{Session, SyncError};

/// What [`RemoteSync::upload_one`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The value was stored remotely.
    Uploaded,
    /// The key was removed remotely.
    Deleted,
    /// The snapshot already held the value; no request was sent.
    Unchanged,
    /// Logged out; no request was sent.
    Offline,
}

/// Sink for local edits made through a [`PreferenceHandle`].
pub trait Uploader {
    /// Push `value` (or a removal, for `None` and the empty string) for `key`.
    fn upload(&self, key: &str, value: Option<&str>) -> Result<UploadOutcome, SyncError>;
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Keys whose local value was replaced by a differing remote value.
    pub adopted: Vec<String>,
    /// Keys only known locally that were uploaded.
    pub uploaded: Vec<String>,
    /// Keys only known locally whose upload failed.
    pub failed: Vec<String>,
}

/// Performs fetch, upload and delete against the remote preference API.
#[derive(Debug)]
pub struct RemoteSync {
    api: PreferencesApi,
    store: PreferenceStore,
    session: Session,
}

fn abbreviate(value: &str) -> String {
    const MAX: usize = 15;
    if value.chars().count() <= MAX {
        value.to_string()
    } else {
        value.chars().take(MAX).chain("...".chars()).collect()
    }
}

impl RemoteSync {
    pub fn new(api: PreferencesApi, store: PreferenceStore, session: Session) -> Self {
        Self {
            api,
            store,
            session,
        }
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch every remote preference and merge it into the store.
    ///
    /// Keys the remote does not have are left untouched locally. On failure
    /// nothing changes.
    pub fn fetch_all(&self) -> Result<BTreeMap<String, String>, SyncError> {
        if !self.session.logged_in() {
            return Err(SyncError::NotLoggedIn);
        }

        let remote = self.api.fetch_all().map_err(|e| {
            log::warn!("Could not fetch preferences: {}", e);
            SyncError::from(e)
        })?;

        self.store.merge(remote.clone());
        Ok(remote)
    }

    /// Fetch, then reconcile `handles` with the result.
    ///
    /// Handles already follow the store during the fetch, so whether a handle
    /// adopted a remote value is judged against its value before the fetch.
    pub fn sync(&self, handles: &[PreferenceHandle]) -> Result<ReconcileReport, SyncError> {
        let before: Vec<Option<String>> = handles.iter().map(PreferenceHandle::get).collect();
        let remote = self.fetch_all()?;
        Ok(self.reconcile_from(&remote, handles, &before))
    }

    /// Apply the merge policy to every handle after a successful fetch.
    ///
    /// - The remote has the key: the remote value wins, even over a local
    ///   edit that was never uploaded.
    /// - The remote lacks the key and the handle holds a non-empty value: the
    ///   local value wins and is uploaded.
    pub fn reconcile(
        &self,
        remote: &BTreeMap<String, String>,
        handles: &[PreferenceHandle],
    ) -> ReconcileReport {
        let before: Vec<Option<String>> = handles.iter().map(PreferenceHandle::get).collect();
        self.reconcile_from(remote, handles, &before)
    }

    fn reconcile_from(
        &self,
        remote: &BTreeMap<String, String>,
        handles: &[PreferenceHandle],
        before: &[Option<String>],
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for (handle, previous) in handles.iter().zip(before) {
            let key = handle.key();

            if let Some(value) = remote.get(key) {
                if previous.as_deref() != Some(value.as_str()) {
                    report.adopted.push(key.to_string());
                }
                handle.adopt_remote(value);
                continue;
            }

            let Some(local) = handle.get().filter(|v| !v.is_empty()) else {
                continue;
            };

            // The snapshot may still hold a value the remote has since lost,
            // so skip the unchanged check and always send it.
            handle.mark(SyncState::PendingUpload);
            let result = self.put(key, &local);
            match &result {
                Ok(_) => report.uploaded.push(key.to_string()),
                Err(_) => report.failed.push(key.to_string()),
            }
            handle.record_outcome(&result, Some(local.as_str()));
        }

        if !report.adopted.is_empty() || !report.uploaded.is_empty() {
            log::debug!(
                "Reconciled preferences: {} adopted from remote, {} uploaded",
                report.adopted.len(),
                report.uploaded.len()
            );
        }
        report
    }

    /// Store `value` under `key` remotely, or remove the key for `None` and
    /// the empty string.
    ///
    /// Nothing is sent while logged out, or when the store already holds the
    /// value. The store is updated once the remote store confirms.
    pub fn upload_one(&self, key: &str, value: Option<&str>) -> Result<UploadOutcome, SyncError> {
        if !self.session.logged_in() {
            log::debug!("Not saving preference {}: not logged in", key);
            return Ok(UploadOutcome::Offline);
        }

        let value = value.filter(|v| !v.is_empty());
        if self.store.get(key).as_deref() == value {
            return Ok(UploadOutcome::Unchanged);
        }

        match value {
            Some(value) => self.put(key, value),
            None => self.remove(key),
        }
    }

    /// Remove `key` from the store and, best effort, from the remote store.
    pub fn delete_one(&self, key: &str) -> Result<(), SyncError> {
        self.store.remove(key);

        if !self.session.logged_in() {
            log::debug!("Not removing preference {} remotely: not logged in", key);
            return Ok(());
        }

        self.api.delete(key).map_err(|e| {
            log::warn!("Could not remove preference {}: {}", key, e);
            SyncError::from(e)
        })
    }
}

impl RemoteSync {
    fn put(&self, key: &str, value: &str) -> Result<UploadOutcome, SyncError> {
        log::debug!("Updating preference {} to {}", key, abbreviate(value));
        self.api.put(key, value).map_err(|e| {
            log::warn!("Could not upload preference {}: {}", key, e);
            SyncError::from(e)
        })?;
        self.store.set_in_place(key, value);
        Ok(UploadOutcome::Uploaded)
    }

    fn remove(&self, key: &str) -> Result<UploadOutcome, SyncError> {
        log::debug!("Removing preference {}", key);
        self.api.delete(key).map_err(|e| {
            log::warn!("Could not remove preference {}: {}", key, e);
            SyncError::from(e)
        })?;
        self.store.remove(key);
        Ok(UploadOutcome::Deleted)
    }
}

impl Uploader for RemoteSync {
    fn upload(&self, key: &str, value: Option<&str>) -> Result<UploadOutcome, SyncError> {
        self.upload_one(key, value)
    }
}
