//! The per-session registry of preference handles.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use prefsync_core::{sanitize_key, ConfigError, PreferenceStore};

use crate::handle::{PreferenceHandle, SyncState};
use crate::long::LongPreference;
use crate::sync::Uploader;

/// Get-or-create access to handles by sanitized key.
#[derive(Clone)]
pub(crate) struct HandleRegistry {
    store: PreferenceStore,
    handles: Rc<RefCell<BTreeMap<String, PreferenceHandle>>>,
    uploader: Option<Weak<dyn Uploader>>,
}

impl HandleRegistry {
    pub(crate) fn store(&self) -> &PreferenceStore {
        &self.store
    }

    /// `key` must already be sanitized.
    pub(crate) fn get_or_create(&self, key: String, default: Option<&str>) -> PreferenceHandle {
        if let Some(handle) = self.handles.borrow().get(&key) {
            return handle.clone();
        }

        let handle =
            PreferenceHandle::new(key.clone(), self.store.get(&key), default, self.uploader.clone());

        let observer = handle.clone();
        self.store.subscribe(move |snapshot| observer.observe(snapshot));

        self.handles.borrow_mut().insert(key, handle.clone());
        handle
    }
}

/// Registry of every preference handle of one user session.
///
/// Each key maps to exactly one [`PreferenceHandle`] (and each long key to one
/// [`LongPreference`]) for the lifetime of the registry. Keys are given without
/// the prefix, which is fixed at construction.
///
/// # Example
///
/// ```rust
/// use prefsync::Preferences;
/// use prefsync_core::PreferenceStore;
///
/// let prefs = Preferences::new(PreferenceStore::new(), "app-");
/// let theme = prefs.get("theme", Some("light"))?;
///
/// assert_eq!(theme.key(), "app-theme");
/// assert_eq!(theme.get().as_deref(), Some("light"));
///
/// theme.set("dark");
/// assert_eq!(prefs.get("theme", None)?.get().as_deref(), Some("dark"));
/// # Ok::<(), prefsync_core::ConfigError>(())
/// ```
#[derive(Clone)]
pub struct Preferences {
    registry: HandleRegistry,
    prefix: Rc<str>,
    longs: Rc<RefCell<BTreeMap<String, LongPreference>>>,
}

impl Preferences {
    /// A registry whose edits stay local.
    pub fn new(store: PreferenceStore, prefix: &str) -> Self {
        Self::build(store, prefix, None)
    }

    /// A registry whose edits are pushed to `uploader` while it is alive.
    pub fn with_uploader(store: PreferenceStore, prefix: &str, uploader: Weak<dyn Uploader>) -> Self {
        Self::build(store, prefix, Some(uploader))
    }

    fn build(store: PreferenceStore, prefix: &str, uploader: Option<Weak<dyn Uploader>>) -> Self {
        Self {
            registry: HandleRegistry {
                store,
                handles: Rc::new(RefCell::new(BTreeMap::new())),
                uploader,
            },
            prefix: Rc::from(prefix),
            longs: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &PreferenceStore {
        self.registry.store()
    }

    /// The handle for `key` (prefixed and sanitized), created on first use
    /// from the store or, failing that, `default`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::KeyTooLong`] if the sanitized key is too long to store.
    pub fn get(&self, key: &str, default: Option<&str>) -> Result<PreferenceHandle, ConfigError> {
        let key = sanitize_key(&self.prefix, key)?;
        Ok(self.registry.get_or_create(key, default))
    }

    /// Like [`get`](Self::get), without the prefix.
    pub fn get_raw(&self, key: &str, default: Option<&str>) -> Result<PreferenceHandle, ConfigError> {
        let key = sanitize_key("", key)?;
        Ok(self.registry.get_or_create(key, default))
    }

    /// The long preference for `key` (prefixed and sanitized), created on
    /// first use.
    ///
    /// # Errors
    ///
    /// [`ConfigError::KeyTooLong`] if the key of its length slot would be too
    /// long to store.
    pub fn get_long(&self, key: &str) -> Result<LongPreference, ConfigError> {
        let base = sanitize_key(&self.prefix, key)?;
        if let Some(long) = self.longs.borrow().get(&base) {
            return Ok(long.clone());
        }

        let long = LongPreference::new(base.clone(), self.registry.clone())?;
        self.longs.borrow_mut().insert(base, long.clone());
        Ok(long)
    }

    /// Every handle created so far, in key order.
    pub fn handles(&self) -> Vec<PreferenceHandle> {
        self.registry.handles.borrow().values().cloned().collect()
    }

    /// Every long preference created so far, in key order.
    pub fn long_preferences(&self) -> Vec<LongPreference> {
        self.longs.borrow().values().cloned().collect()
    }

    /// Number of handles created so far.
    pub fn len(&self) -> usize {
        self.registry.handles.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.handles.borrow().is_empty()
    }

    pub(crate) fn mark_all_unsynced(&self) {
        for handle in self.registry.handles.borrow().values() {
            handle.mark(SyncState::UnsyncedLocal);
        }
    }
}
