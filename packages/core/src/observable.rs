//! A single-threaded reactive value.
//!
//! [`Observable`] is the primitive the preference layer is built on: a shared
//! cell that notifies subscribers when its value changes. Notification is
//! synchronous. Callbacks are collected before dispatch, so a callback may
//! freely read or write the observable that invoked it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Identifies a registered callback, used to unsubscribe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Callback<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: T,
    next_id: u64,
    callbacks: Vec<(Subscription, Callback<T>)>,
}

/// A shared, observable value.
///
/// Cloning an `Observable` yields another handle to the same value.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use prefsync_core::Observable;
///
/// let theme = Observable::new("light".to_string());
/// let seen = Rc::new(Cell::new(0));
///
/// let counter = seen.clone();
/// theme.subscribe(move |_| counter.set(counter.get() + 1));
///
/// theme.set("dark".to_string());
/// theme.set("dark".to_string()); // unchanged, no notification
/// assert_eq!(seen.get(), 1);
/// ```
pub struct Observable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("subscribers", &inner.callbacks.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    /// A clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Run `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value and notify subscribers.
    ///
    /// Setting a value equal to the current one does nothing. Returns whether
    /// the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
        }
        self.notify();
        true
    }

    /// Replace the value and notify subscribers even if it is unchanged.
    pub fn set_forced(&self, value: T) {
        self.inner.borrow_mut().value = value;
        self.notify();
    }

    /// Notify subscribers without changing the value.
    pub fn ping(&self) {
        self.notify();
    }

    /// Register `callback` to run after every change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = Subscription(inner.next_id);
        inner.next_id += 1;
        inner.callbacks.push((id, Rc::new(callback)));
        id
    }

    /// Register `callback` and run it once immediately with the current value.
    pub fn subscribe_and_run(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let current = self.get();
        callback(&current);
        self.subscribe(callback)
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.callbacks.len();
        inner.callbacks.retain(|(id, _)| *id != subscription);
        inner.callbacks.len() != before
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }

    /// Derive an observable that tracks `f` applied to this one.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let derived = Observable::new(self.with(&f));
        let target = derived.clone();
        self.subscribe(move |value| {
            target.set(f(value));
        });
        derived
    }

    /// Derive an observable from this one and `other`. It is recomputed when
    /// either input changes.
    pub fn combine<U, V, F>(&self, other: &Observable<U>, f: F) -> Observable<V>
    where
        U: Clone + PartialEq + 'static,
        V: Clone + PartialEq + 'static,
        F: Fn(&T, &U) -> V + 'static,
    {
        let f = Rc::new(f);
        let derived = Observable::new(f(&self.get(), &other.get()));

        {
            let target = derived.clone();
            let other = other.clone();
            let f = f.clone();
            self.subscribe(move |left| {
                let right = other.get();
                target.set(f(left, &right));
            });
        }
        {
            let target = derived.clone();
            let this = self.clone();
            other.subscribe(move |right| {
                let left = this.get();
                target.set(f(&left, right));
            });
        }

        derived
    }

    fn notify(&self) {
        let (value, callbacks) = {
            let inner = self.inner.borrow();
            let callbacks: Vec<Callback<T>> =
                inner.callbacks.iter().map(|(_, cb)| cb.clone()).collect();
            (inner.value.clone(), callbacks)
        };

        for callback in callbacks {
            callback(&value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, impl Fn(&String) + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move |_: &String| c.set(c.get() + 1))
    }

    #[test]
    fn set_notifies_on_change_only() {
        let value = Observable::new("a".to_string());
        let (count, callback) = counter();
        value.subscribe(callback);

        assert!(value.set("b".to_string()));
        assert!(!value.set("b".to_string()));
        assert_eq!(count.get(), 1);
        assert_eq!(value.get(), "b");
    }

    #[test]
    fn forced_set_and_ping_always_notify() {
        let value = Observable::new("a".to_string());
        let (count, callback) = counter();
        value.subscribe(callback);

        value.set_forced("a".to_string());
        value.ping();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let value = Observable::new("a".to_string());
        let (count, callback) = counter();
        let sub = value.subscribe(callback);

        assert!(value.unsubscribe(sub));
        assert!(!value.unsubscribe(sub));
        value.set("b".to_string());
        assert_eq!(count.get(), 0);
        assert_eq!(value.subscriber_count(), 0);
    }

    #[test]
    fn subscribe_and_run_fires_immediately() {
        let value = Observable::new("a".to_string());
        let (count, callback) = counter();
        value.subscribe_and_run(callback);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn callbacks_may_write_back() {
        let value = Observable::new(0u32);
        let this = value.clone();
        value.subscribe(move |v| {
            if *v < 5 {
                this.set(v + 1);
            }
        });

        value.set(1);
        assert_eq!(value.get(), 5);
    }

    #[test]
    fn clones_share_state() {
        let a = Observable::new(1u8);
        let b = a.clone();
        b.set(2);
        assert_eq!(a.get(), 2);
    }

    #[test]
    fn map_tracks_source() {
        let source = Observable::new("abc".to_string());
        let len = source.map(|s| s.len());
        assert_eq!(len.get(), 3);

        source.set("abcdef".to_string());
        assert_eq!(len.get(), 6);
    }

    #[test]
    fn combine_tracks_both_inputs() {
        let left = Observable::new(2u32);
        let right = Observable::new(3u32);
        let sum = left.combine(&right, |a, b| a + b);
        assert_eq!(sum.get(), 5);

        left.set(10);
        assert_eq!(sum.get(), 13);
        right.set(0);
        assert_eq!(sum.get(), 10);
    }
}
