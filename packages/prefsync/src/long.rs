//! Preferences longer than one remote value.
//!
//! A long value is spread over slots `<key>-combined-0 .. <key>-combined-(n-1)`
//! of at most [`SLOT_LENGTH`] bytes each, plus a slot
//! `<key>-combined-length` holding `n` in decimal. The children are always
//! written before the length that refers to them, and the length is not
//! written at all if a child could not be stored.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use prefsync_core::{
    chunk_slot_key, length_slot_key, sanitize_key, ConfigError, Observable, Snapshot,
    Subscription, MAX_CHUNKS, SLOT_LENGTH,
};

use crate::handle::PreferenceHandle;
use crate::registry::HandleRegistry;
use crate::SyncError;

/// Split `value` into pieces of at most [`SLOT_LENGTH`] bytes, in order.
/// A character is never split across two pieces.
///
/// ```rust
/// use prefsync::long::split_into_slots;
///
/// let slots = split_into_slots(&"x".repeat(600));
/// assert_eq!(slots.iter().map(|s| s.len()).collect::<Vec<_>>(), vec![255, 255, 90]);
/// assert!(split_into_slots("").is_empty());
/// ```
pub fn split_into_slots(value: &str) -> Vec<String> {
    let mut slots = Vec::new();
    let mut current = String::new();
    for c in value.chars() {
        if current.len() + c.len_utf8() > SLOT_LENGTH {
            slots.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        slots.push(current);
    }
    slots
}

/// Rebuild the long value `base` from the slots held in `snapshot`.
///
/// Returns `None` when there is nothing to rebuild from yet: the snapshot is
/// empty (nothing fetched), has no length slot for `base`, or the length is
/// unusable. A missing chunk reads as empty and is logged.
pub fn reassemble(snapshot: &Snapshot, base: &str) -> Option<String> {
    if snapshot.is_empty() {
        return None;
    }

    let raw_count = snapshot.get(&length_slot_key(base))?;
    let count: usize = match raw_count.trim().parse() {
        Ok(count) => count,
        Err(_) => {
            log::warn!(
                "Long preference {} has an invalid length {:?}",
                base,
                raw_count
            );
            return None;
        }
    };
    if count > MAX_CHUNKS {
        log::warn!(
            "Long preference {} claims {} slots, more than the {} allowed",
            base,
            count,
            MAX_CHUNKS
        );
        return None;
    }

    let mut value = String::new();
    for index in 0..count {
        let key = chunk_slot_key(base, index);
        match snapshot.get(&key) {
            Some(chunk) => value.push_str(chunk),
            None => log::warn!("Detected a broken long preference: {} is missing", key),
        }
    }
    Some(value)
}

struct LongInner {
    key: String,
    registry: HandleRegistry,
    length: PreferenceHandle,
    value: Observable<Option<String>>,
    /// Last value rebuilt from the store.
    decoded: RefCell<Option<String>>,
    encoding: Cell<bool>,
}

/// Reactive accessor for one preference of arbitrary length.
///
/// Obtained from [`Preferences::get_long`](crate::Preferences::get_long).
#[derive(Clone)]
pub struct LongPreference {
    inner: Rc<LongInner>,
}

impl fmt::Debug for LongPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongPreference")
            .field("key", &self.inner.key)
            .field("chunks", &self.chunk_count())
            .finish()
    }
}

/// Clears the `encoding` flag when an encode ends, however it ends.
struct EncodingGuard<'a>(&'a Cell<bool>);

impl<'a> EncodingGuard<'a> {
    fn new(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for EncodingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl LongPreference {
    pub(crate) fn new(key: String, registry: HandleRegistry) -> Result<Self, ConfigError> {
        let length_key = sanitize_key("", &length_slot_key(&key))?;
        let length = registry.get_or_create(length_key, None);

        let long = Self {
            inner: Rc::new(LongInner {
                key,
                registry,
                length,
                value: Observable::new(None),
                decoded: RefCell::new(None),
                encoding: Cell::new(false),
            }),
        };

        let weak = Rc::downgrade(&long.inner);
        long.inner.length.subscribe(move |_| {
            if let Some(long) = Self::upgrade(&weak) {
                long.decode(false);
            }
        });

        let weak = Rc::downgrade(&long.inner);
        long.inner.registry.store().subscribe(move |_| {
            if let Some(long) = Self::upgrade(&weak) {
                long.decode(false);
            }
        });

        if long.inner.length.get().is_some() {
            long.decode(true);
        }

        Ok(long)
    }

    fn upgrade(weak: &Weak<LongInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// The sanitized base key.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn get(&self) -> Option<String> {
        self.inner.value.get()
    }

    /// Number of slots recorded by the length slot.
    pub fn chunk_count(&self) -> usize {
        self.inner
            .length
            .get()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn subscribe(&self, callback: impl Fn(&Option<String>) + 'static) -> Subscription {
        self.inner.value.subscribe(callback)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.inner.value.unsubscribe(subscription)
    }

    /// Store `value`. The empty string is ignored and leaves existing slots
    /// alone; use [`delete`](Self::delete) to remove the value.
    pub fn set(&self, value: &str) -> Result<(), SyncError> {
        self.encode(Some(value))
    }

    /// Remove the value and every slot it occupies.
    pub fn delete(&self) -> Result<(), SyncError> {
        self.encode(None)
    }

    /// Write `value` across the slots.
    ///
    /// - `Some("")` does nothing.
    /// - `None` removes every slot named by the current length, then the
    ///   length slot.
    /// - Otherwise the value is split into slots, each slot is written, and
    ///   only then the new length. Slots left over from a longer previous
    ///   value are removed last.
    ///
    /// While logged out the slots are written locally only; that is not an
    /// error.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::TooManyChunks`] if the value needs more than
    ///   [`MAX_CHUNKS`] slots. Nothing is written in that case.
    /// - [`SyncError::Network`] if a slot could not be stored remotely. The
    ///   length slot is left as it was, and the value is not updated.
    /// - On delete, the first slot that could not be removed. Every slot is
    ///   still attempted.
    pub fn encode(&self, value: Option<&str>) -> Result<(), SyncError> {
        let previous_count = self.chunk_count();

        let Some(value) = value else {
            log::debug!("Deleting long preference {}", self.inner.key);
            let result = {
                let _guard = EncodingGuard::new(&self.inner.encoding);
                let mut first_error = None;
                let slots = (0..previous_count).map(|index| self.chunk(index));
                for slot in slots.chain(std::iter::once(self.inner.length.clone())) {
                    if let Err(e) = slot.try_clear() {
                        first_error.get_or_insert(e);
                    }
                }
                first_error.map_or(Ok(()), Err)
            };
            self.inner.value.set(None);
            self.remember_decoded();
            return result;
        };

        if value.is_empty() {
            return Ok(());
        }

        let chunks = split_into_slots(value);
        if chunks.len() > MAX_CHUNKS {
            return Err(ConfigError::TooManyChunks {
                key: self.inner.key.clone(),
                chunks: chunks.len(),
            }
            .into());
        }

        {
            let _guard = EncodingGuard::new(&self.inner.encoding);
            for (index, chunk) in chunks.iter().enumerate() {
                self.chunk(index).try_set(chunk.as_str()).map_err(|e| {
                    log::warn!(
                        "Not updating the length of {}: slot {} was not stored",
                        self.inner.key,
                        index
                    );
                    e
                })?;
            }
            self.inner.length.try_set(chunks.len().to_string())?;
            for index in chunks.len()..previous_count {
                let slot = self.chunk(index);
                if slot.try_clear().is_err() {
                    log::warn!("Left stale slot {} behind", slot.key());
                }
            }
        }

        self.inner.value.set(Some(value.to_string()));
        self.remember_decoded();
        Ok(())
    }

    /// Rebuild the value from the store, even if the slots did not change
    /// since the last rebuild.
    pub fn refresh(&self) {
        self.decode(true);
    }

    fn chunk(&self, index: usize) -> PreferenceHandle {
        self.inner
            .registry
            .get_or_create(chunk_slot_key(&self.inner.key, index), None)
    }

    fn decode(&self, force: bool) {
        if self.inner.encoding.get() {
            return;
        }

        let snapshot = self.inner.registry.store().snapshot();
        let Some(value) = reassemble(&snapshot, &self.inner.key) else {
            return;
        };

        let stale = self.inner.decoded.borrow().as_deref() != Some(value.as_str());
        if stale || force {
            *self.inner.decoded.borrow_mut() = Some(value.clone());
            self.inner.value.set(Some(value));
        }
    }

    fn remember_decoded(&self) {
        let snapshot = self.inner.registry.store().snapshot();
        *self.inner.decoded.borrow_mut() = reassemble(&snapshot, &self.inner.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Preferences;
    use prefsync_core::PreferenceStore;

    fn snapshot_of(pairs: &[(&str, &str)]) -> std::rc::Rc<Snapshot> {
        let store = PreferenceStore::new();
        store.merge(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        store.snapshot()
    }

    #[test]
    fn slots_are_measured_in_bytes() {
        let value = "é".repeat(300);
        let slots = split_into_slots(&value);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].chars().count(), 127);
        assert_eq!(slots[0].len(), 254);
        assert_eq!(slots[2].chars().count(), 46);
        assert!(slots.iter().all(|s| s.len() <= SLOT_LENGTH));
        assert_eq!(slots.concat(), value);
    }

    #[test]
    fn mixed_width_characters_fill_slots_exactly() {
        let value = format!("{}é{}", "a".repeat(253), "b".repeat(10));
        let slots = split_into_slots(&value);
        assert_eq!(slots[0].len(), 255);
        assert!(slots[0].ends_with('é'));
        assert_eq!(slots[1], "b".repeat(10));
    }

    #[test]
    fn reassembles_in_numeric_order() {
        let chunks: Vec<String> = (0..12).map(|i| format!("<{}>", i)).collect();
        let keys: Vec<String> = (0..12).map(|i| format!("n-combined-{}", i)).collect();
        let mut pairs = vec![("n-combined-length", "12")];
        for (k, v) in keys.iter().zip(chunks.iter()) {
            pairs.push((k.as_str(), v.as_str()));
        }

        let value = reassemble(&snapshot_of(&pairs), "n").unwrap();
        assert_eq!(value, chunks.concat());
    }

    #[test]
    fn missing_chunk_reads_as_empty() {
        let snapshot = snapshot_of(&[
            ("n-combined-length", "3"),
            ("n-combined-0", "a"),
            ("n-combined-2", "c"),
        ]);
        assert_eq!(reassemble(&snapshot, "n").as_deref(), Some("ac"));
    }

    #[test]
    fn nothing_to_reassemble() {
        assert_eq!(reassemble(&Snapshot::default(), "n"), None);
        assert_eq!(reassemble(&snapshot_of(&[("other", "x")]), "n"), None);
        assert_eq!(
            reassemble(&snapshot_of(&[("n-combined-length", "many")]), "n"),
            None
        );
        assert_eq!(
            reassemble(&snapshot_of(&[("n-combined-length", "101")]), "n"),
            None
        );
    }

    #[test]
    fn encode_writes_children_then_length() {
        let prefs = Preferences::new(PreferenceStore::new(), "app-");
        let long = prefs.get_long("notes").unwrap();

        let order = Rc::new(RefCell::new(Vec::new()));
        for key in ["app-notes-combined-0", "app-notes-combined-1", "app-notes-combined-2", "app-notes-combined-length"] {
            let handle = prefs.get_raw(key, None).unwrap();
            let order = order.clone();
            handle.subscribe(move |_| order.borrow_mut().push(key));
        }

        long.set(&"x".repeat(600)).unwrap();

        assert_eq!(
            *order.borrow(),
            vec![
                "app-notes-combined-0",
                "app-notes-combined-1",
                "app-notes-combined-2",
                "app-notes-combined-length"
            ]
        );
        assert_eq!(long.chunk_count(), 3);
        assert_eq!(long.get().map(|v| v.len()), Some(600));
    }

    #[test]
    fn empty_string_is_a_no_op() {
        let prefs = Preferences::new(PreferenceStore::new(), "app-");
        let long = prefs.get_long("notes").unwrap();
        long.set("kept").unwrap();

        long.set("").unwrap();

        assert_eq!(long.get().as_deref(), Some("kept"));
        assert_eq!(long.chunk_count(), 1);
    }

    #[test]
    fn delete_clears_every_slot() {
        let prefs = Preferences::new(PreferenceStore::new(), "app-");
        let long = prefs.get_long("notes").unwrap();
        long.set(&"y".repeat(600)).unwrap();

        long.delete().unwrap();

        assert_eq!(long.get(), None);
        assert_eq!(long.chunk_count(), 0);
        for index in 0..3 {
            let slot = prefs
                .get_raw(&format!("app-notes-combined-{}", index), None)
                .unwrap();
            assert_eq!(slot.get(), None);
        }
    }

    #[test]
    fn ceiling_is_enforced_before_writing() {
        let prefs = Preferences::new(PreferenceStore::new(), "app-");
        let long = prefs.get_long("notes").unwrap();
        long.set("committed").unwrap();

        let err = long.set(&"z".repeat(26_000)).unwrap_err();

        assert!(matches!(
            err,
            SyncError::Config(ConfigError::TooManyChunks { ref key, chunks: 102 }) if key == "app-notes"
        ));
        assert_eq!(long.get().as_deref(), Some("committed"));
        assert_eq!(long.chunk_count(), 1);
        assert_eq!(
            prefs
                .get_raw("app-notes-combined-0", None)
                .unwrap()
                .get()
                .as_deref(),
            Some("committed")
        );
    }

    #[test]
    fn hundred_slots_fit() {
        let prefs = Preferences::new(PreferenceStore::new(), "app-");
        let long = prefs.get_long("notes").unwrap();

        long.set(&"q".repeat(SLOT_LENGTH * MAX_CHUNKS)).unwrap();
        assert_eq!(long.chunk_count(), MAX_CHUNKS);
    }

    #[test]
    fn shrinking_removes_trailing_slots() {
        let prefs = Preferences::new(PreferenceStore::new(), "app-");
        let long = prefs.get_long("notes").unwrap();
        long.set(&"a".repeat(600)).unwrap();

        long.set("short").unwrap();

        assert_eq!(long.chunk_count(), 1);
        let stale = prefs.get_raw("app-notes-combined-2", None).unwrap();
        assert_eq!(stale.get(), None);
    }

    #[test]
    fn decodes_existing_store_on_creation() {
        let store = PreferenceStore::new();
        store.merge([
            ("app-notes-combined-length", "2"),
            ("app-notes-combined-0", "hello "),
            ("app-notes-combined-1", "world"),
        ]);
        let prefs = Preferences::new(store, "app-");

        let long = prefs.get_long("notes").unwrap();
        assert_eq!(long.get().as_deref(), Some("hello world"));
    }

    #[test]
    fn follows_store_updates() {
        let store = PreferenceStore::new();
        let prefs = Preferences::new(store.clone(), "app-");
        let long = prefs.get_long("notes").unwrap();
        assert_eq!(long.get(), None);

        store.merge([
            ("app-notes-combined-length", "1"),
            ("app-notes-combined-0", "remote"),
        ]);
        assert_eq!(long.get().as_deref(), Some("remote"));

        store.set_in_place("app-notes-combined-0", "edited elsewhere");
        assert_eq!(long.get().as_deref(), Some("edited elsewhere"));
    }

    #[test]
    fn empty_store_does_not_clear_local_value() {
        let store = PreferenceStore::new();
        let prefs = Preferences::new(store.clone(), "app-");
        let long = prefs.get_long("notes").unwrap();
        long.set("typed before the first fetch").unwrap();

        store.ping();
        long.refresh();

        assert_eq!(long.get().as_deref(), Some("typed before the first fetch"));
    }

    #[test]
    fn rejects_base_keys_too_long_for_the_length_slot() {
        let prefs = Preferences::new(PreferenceStore::new(), "");
        let err = prefs.get_long(&"k".repeat(240)).unwrap_err();
        assert!(matches!(err, ConfigError::KeyTooLong { .. }));
    }
}
