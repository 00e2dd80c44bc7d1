//! The assembled synchronization layer for one user session.

use std::rc::{Rc, Weak};

use prefsync_core::{sanitize_key, ConfigError, PreferenceStore, Subscription};
use prefsync_http::PreferencesApi;

use crate::handle::PreferenceHandle;
use crate::long::LongPreference;
use crate::registry::Preferences;
use crate::sync::{ReconcileReport, RemoteSync, Uploader};
use crate::{Session, SyncError};

/// Preferences of one user, kept in sync with the remote store.
///
/// Logging in through the [`Session`] triggers a [`sync`](Self::sync);
/// logging out leaves every handle usable but local-only until the next
/// login. A session that is already logged in when this is built is not
/// synced until [`sync`](Self::sync) is called.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use prefsync::{PreferenceSync, Session};
/// use prefsync_http::{mock::MockExecutor, PreferencesApi};
///
/// let server = MockExecutor::serving_preferences([("app-theme", "dark")]);
/// let api = PreferencesApi::new("http://mock/api/", Arc::new(server.clone()))?;
/// let session = Session::new();
/// let prefs = PreferenceSync::new(api, session.clone(), "app-");
///
/// let theme = prefs.preference("theme", Some("light"))?;
/// assert_eq!(theme.get().as_deref(), Some("light"));
///
/// session.log_in();
/// assert_eq!(theme.get().as_deref(), Some("dark"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PreferenceSync {
    remote: Rc<RemoteSync>,
    preferences: Preferences,
    login: Subscription,
    logout: Subscription,
}

impl std::fmt::Debug for PreferenceSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceSync")
            .field("remote", &self.remote)
            .field("prefix", &self.preferences.prefix())
            .finish()
    }
}

fn run_sync(remote: &RemoteSync, preferences: &Preferences) -> Result<ReconcileReport, SyncError> {
    let report = remote.sync(&preferences.handles())?;
    for long in preferences.long_preferences() {
        long.refresh();
    }
    Ok(report)
}

impl PreferenceSync {
    pub fn new(api: PreferencesApi, session: Session, prefix: &str) -> Self {
        let store = PreferenceStore::new();
        let remote = Rc::new(RemoteSync::new(api, store.clone(), session.clone()));

        let uploader: Weak<dyn Uploader> = Rc::downgrade(&remote) as Weak<dyn Uploader>;
        let preferences = Preferences::with_uploader(store, prefix, uploader);

        let weak = Rc::downgrade(&remote);
        let registry = preferences.clone();
        let login = session.on_login(move || {
            let Some(remote) = weak.upgrade() else {
                return;
            };
            if let Err(e) = run_sync(&remote, &registry) {
                log::warn!("Could not sync preferences after login: {}", e);
            }
        });

        let registry = preferences.clone();
        let logout = session.on_logout(move || registry.mark_all_unsynced());

        Self {
            remote,
            preferences,
            login,
            logout,
        }
    }

    /// Fetch every remote preference and reconcile it with the local
    /// handles. Long preferences are rebuilt afterwards.
    pub fn sync(&self) -> Result<ReconcileReport, SyncError> {
        run_sync(&self.remote, &self.preferences)
    }

    /// The handle for `key`, which is prefixed and sanitized.
    pub fn preference(&self, key: &str, default: Option<&str>) -> Result<PreferenceHandle, ConfigError> {
        self.preferences.get(key, default)
    }

    pub fn long_preference(&self, key: &str) -> Result<LongPreference, ConfigError> {
        self.preferences.get_long(key)
    }

    /// Remove `key` (prefixed and sanitized) locally and, best effort,
    /// remotely.
    pub fn delete(&self, key: &str) -> Result<(), SyncError> {
        let key = sanitize_key(self.preferences.prefix(), key)?;
        self.remote.delete_one(&key)
    }

    pub fn store(&self) -> &PreferenceStore {
        self.remote.store()
    }

    pub fn session(&self) -> &Session {
        self.remote.session()
    }

    pub fn remote(&self) -> &RemoteSync {
        &self.remote
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }
}

impl Drop for PreferenceSync {
    fn drop(&mut self) {
        let session = self.remote.session();
        session.unsubscribe(self.login);
        session.unsubscribe(self.logout);
    }
}
