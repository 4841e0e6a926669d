use tokio::sync::watch;
use tracing::{debug, info};

use crate::models::UserProfile;

/// Who, if anyone, is signed in.
///
/// Fields are private so `is_authenticated` can never disagree with `user`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<UserProfile>,
    is_authenticated: bool,
}

impl Session {
    fn signed_in(user: UserProfile) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Id of the signed-in user
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// The process-wide session container.
///
/// Two transitions exist, `set_user` and `clear_user`; each replaces the whole
/// `Session` in one step. Observers get a `watch` receiver and are only woken
/// when the value actually changes.
pub struct SessionState {
    tx: watch::Sender<Session>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self { tx }
    }

    pub fn set_user(&self, user: UserProfile) {
        let next = Session::signed_in(user);
        let changed = self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            info!(user_id = ?self.snapshot().user_id(), "Session established");
        }
    }

    pub fn clear_user(&self) {
        let changed = self.tx.send_if_modified(|current| {
            if current.user.is_none() {
                false
            } else {
                *current = Session::default();
                true
            }
        });
        if changed {
            info!("Session cleared");
        } else {
            debug!("Session already empty");
        }
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.tx.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            username: id.to_string(),
            profile_picture: None,
            profession: None,
            bio: None,
            is_verified: true,
            is_blocked: false,
            is_google_user: false,
        }
    }

    #[test]
    fn test_starts_empty() {
        let state = SessionState::new();
        let session = state.snapshot();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[test]
    fn test_set_user_is_idempotent() {
        let state = SessionState::new();
        state.set_user(profile("u1"));
        let once = state.snapshot();
        state.set_user(profile("u1"));
        assert_eq!(state.snapshot(), once);
        assert!(once.is_authenticated());
        assert_eq!(once.user_id(), Some("u1"));
    }

    #[test]
    fn test_clear_user_is_idempotent() {
        let state = SessionState::new();
        state.set_user(profile("u1"));
        state.clear_user();
        let once = state.snapshot();
        state.clear_user();
        assert_eq!(state.snapshot(), once);
        assert_eq!(once, Session::default());
    }

    #[test]
    fn test_set_user_replaces_whole_profile() {
        let state = SessionState::new();
        state.set_user(profile("u1"));
        let mut updated = profile("u1");
        updated.bio = Some("New bio".to_string());
        state.set_user(updated.clone());
        assert_eq!(state.current_user(), Some(updated));
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions_only_on_change() {
        let state = SessionState::new();
        let mut rx = state.subscribe();

        state.set_user(profile("u1"));
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());

        state.set_user(profile("u1"));
        assert!(!rx.has_changed().unwrap());

        state.clear_user();
        rx.changed().await.unwrap();
        assert!(!rx.borrow().is_authenticated());
    }
}
