//! Authenticated-user session and its event bus.
//!
//! The session owns the current user (if any) and a process-wide
//! subscriber list for login/logout notifications. Subscribers are
//! plain closures registered with `on` and removed with `off` — pages
//! that need to react to a login (e.g. re-fetch permission-gated
//! fields) register a handler on entry and must unregister it on
//! teardown.

use crate::store::User;
use crate::util::{ListenerId, Listeners};

/// Events broadcast by the session bus.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoggedIn(User),
    LoggedOut,
}

pub struct Session {
    user: Option<User>,
    listeners: Listeners<SessionEvent>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            user: None,
            listeners: Listeners::new(),
        }
    }

    /// The currently authenticated user, if logged in.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Subscribe to session events. The returned id must be kept and
    /// passed to [`off`](Self::off) when the subscriber goes away.
    pub fn on<F>(&mut self, f: F) -> ListenerId
    where
        F: Fn(&SessionEvent) + Send + 'static,
    {
        self.listeners.on(f)
    }

    /// Unsubscribe. Returns false when the id was already removed.
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.listeners.off(id)
    }

    /// Number of registered subscribers. Used by teardown tests to
    /// verify handlers are removed exactly once.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Store the resolved user and notify subscribers.
    pub fn log_in(&mut self, user: User) {
        tracing::info!(user = %user.username, "Session established");
        self.user = Some(user.clone());
        self.listeners.emit(&SessionEvent::LoggedIn(user));
    }

    /// Clear the user and notify subscribers.
    pub fn log_out(&mut self) {
        if self.user.take().is_some() {
            tracing::info!("Session cleared");
            self.listeners.emit(&SessionEvent::LoggedOut);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_user() -> User {
        User {
            id: 7,
            username: "toby".to_string(),
            display_name: "Toby".to_string(),
        }
    }

    #[test]
    fn test_login_emits_event() {
        let mut session = Session::new();
        let logins = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&logins);
        session.on(move |e| {
            if matches!(e, SessionEvent::LoggedIn(_)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        session.log_in(test_user());
        assert_eq!(logins.load(Ordering::SeqCst), 1);
        assert_eq!(session.user().map(|u| u.id), Some(7));
    }

    #[test]
    fn test_off_stops_delivery() {
        let mut session = Session::new();
        let logins = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&logins);
        let id = session.on(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(session.off(id));
        session.log_in(test_user());
        assert_eq!(logins.load(Ordering::SeqCst), 0);
        assert_eq!(session.listener_count(), 0);
    }

    #[test]
    fn test_logout_without_login_is_silent() {
        let mut session = Session::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        session.on(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.log_out();
        assert_eq!(events.load(Ordering::SeqCst), 0);
    }
}
