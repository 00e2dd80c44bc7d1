//! The local preference cache.
//!
//! [`PreferenceStore`] holds the single source of local truth: a versioned,
//! copy-on-write [`Snapshot`] of every key/value pair known to be in the
//! remote store. Each mutation produces a new snapshot with a higher version
//! and notifies subscribers once. Subscribers always receive the whole
//! snapshot and should re-derive their state from it.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::observable::{Observable, Subscription};

/// An immutable view of the preference mapping at one version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    version: u64,
    entries: BTreeMap<String, String>,
}

impl Snapshot {
    /// Monotonic version, bumped by every mutation of the store.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

/// Shared, observable preference mapping.
///
/// Cloning a `PreferenceStore` yields another handle to the same mapping.
///
/// # Example
///
/// ```rust
/// use prefsync_core::PreferenceStore;
///
/// let store = PreferenceStore::new();
/// let before = store.snapshot();
///
/// store.set_in_place("app-theme", "dark");
///
/// assert_eq!(store.get("app-theme").as_deref(), Some("dark"));
/// assert!(before.version() < store.version());
/// assert_eq!(before.get("app-theme"), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct PreferenceStore {
    snapshot: Observable<Rc<Snapshot>>,
}

impl PreferenceStore {
    /// Create an empty store at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Later mutations do not affect it.
    pub fn snapshot(&self) -> Rc<Snapshot> {
        self.snapshot.get()
    }

    pub fn version(&self) -> u64 {
        self.snapshot.with(|s| s.version)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.snapshot.with(|s| s.entries.get(key).cloned())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.snapshot.with(|s| s.entries.contains_key(key))
    }

    pub fn len(&self) -> usize {
        self.snapshot.with(|s| s.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.with(|s| s.entries.is_empty())
    }

    /// Set one key and notify subscribers. Does nothing if `key` already
    /// holds `value`.
    pub fn set_in_place(&self, key: &str, value: &str) {
        if self.get(key).as_deref() == Some(value) {
            return;
        }
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        });
    }

    /// Remove one key and notify subscribers. Returns the removed value.
    pub fn remove(&self, key: &str) -> Option<String> {
        let previous = self.get(key)?;
        self.mutate(|entries| {
            entries.remove(key);
        });
        Some(previous)
    }

    /// Apply every pair of `remote` and notify subscribers once.
    ///
    /// Keys absent from `remote` are left untouched. Returns the number of
    /// keys whose value changed.
    pub fn merge<I, K, V>(&self, remote: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let current = self.snapshot();
        let changed: Vec<(String, String)> = remote
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, v)| current.get(k) != Some(v.as_str()))
            .collect();

        if changed.is_empty() {
            return 0;
        }

        let count = changed.len();
        self.mutate(move |entries| entries.extend(changed));
        log::debug!("Merged {} changed preference(s)", count);
        count
    }

    /// Notify subscribers without changing anything.
    pub fn ping(&self) {
        self.snapshot.ping();
    }

    /// Run `callback` with the new snapshot after every change.
    pub fn subscribe(&self, callback: impl Fn(&Rc<Snapshot>) + 'static) -> Subscription {
        self.snapshot.subscribe(callback)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.snapshot.unsubscribe(subscription)
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) {
        let mut next = Snapshot::clone(&self.snapshot());
        f(&mut next.entries);
        next.version += 1;
        self.snapshot.set_forced(Rc::new(next));
    }
}
