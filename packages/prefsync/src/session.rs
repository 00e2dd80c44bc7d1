//! Login state of the current user.

use prefsync_core::{Observable, Subscription};

/// Whether a user is logged in. Every remote operation is gated on it.
///
/// Cloning a `Session` yields another handle to the same state.
#[derive(Clone, Debug, Default)]
pub struct Session {
    logged_in: Observable<bool>,
}

impl Session {
    /// A logged-out session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in(&self) -> bool {
        self.logged_in.get()
    }

    /// Mark the user as logged in, running `on_login` callbacks if they were
    /// logged out.
    pub fn log_in(&self) {
        self.logged_in.set(true);
    }

    /// Mark the user as logged out, running `on_logout` callbacks if they were
    /// logged in.
    pub fn log_out(&self) {
        self.logged_in.set(false);
    }

    /// Run `callback` on every transition to logged in.
    pub fn on_login(&self, callback: impl Fn() + 'static) -> Subscription {
        self.logged_in.subscribe(move |logged_in| {
            if *logged_in {
                callback();
            }
        })
    }

    /// Run `callback` on every transition to logged out.
    pub fn on_logout(&self, callback: impl Fn() + 'static) -> Subscription {
        self.logged_in.subscribe(move |logged_in| {
            if !*logged_in {
                callback();
            }
        })
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.logged_in.unsubscribe(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn starts_logged_out() {
        assert!(!Session::new().logged_in());
    }

    #[test]
    fn login_callbacks_fire_on_transition_only() {
        let session = Session::new();
        let logins = Rc::new(Cell::new(0));
        let logouts = Rc::new(Cell::new(0));

        let l = logins.clone();
        session.on_login(move || l.set(l.get() + 1));
        let l = logouts.clone();
        session.on_logout(move || l.set(l.get() + 1));

        session.log_in();
        session.log_in();
        session.log_out();
        session.log_out();
        session.log_in();

        assert_eq!(logins.get(), 2);
        assert_eq!(logouts.get(), 1);
        assert!(session.logged_in());
    }

    #[test]
    fn clones_share_state() {
        let session = Session::new();
        let other = session.clone();
        other.log_in();
        assert!(session.logged_in());
    }
}
