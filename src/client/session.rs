//! Subscribable session state.
//!
//! One writer ([`AuthClient`](super::AuthClient)) publishes into a `watch`
//! channel; pages and other readers hold receivers and see every change.

use tokio::sync::watch;

use crate::auth::types::SessionPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub data: Option<SessionPayload>,
    /// True until the first session lookup resolves.
    pub is_pending: bool,
}

impl SessionState {
    #[must_use]
    pub fn pending() -> Self {
        Self {
            data: None,
            is_pending: true,
        }
    }

    #[must_use]
    pub fn resolved(data: Option<SessionPayload>) -> Self {
        Self {
            data,
            is_pending: false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::pending()
    }
}

#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<SessionState>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::pending());
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Publish a resolved session (or its absence) to every subscriber.
    pub fn publish(&self, data: Option<SessionPayload>) {
        self.tx.send_replace(SessionState::resolved(data));
    }

    pub fn clear(&self) {
        self.publish(None);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{SessionInfo, UserInfo};
    use anyhow::Result;
    use chrono::Utc;

    fn payload() -> SessionPayload {
        let now = Utc::now();
        SessionPayload {
            session: SessionInfo {
                id: "1".to_string(),
                user_id: "1".to_string(),
                expires_at: now,
                ip_address: None,
                user_agent: None,
                created_at: now,
                updated_at: now,
            },
            user: UserInfo {
                id: "1".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                email_verified: false,
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn starts_pending() {
        let store = SessionStore::new();
        assert_eq!(store.current(), SessionState::pending());
        assert!(store.subscribe().borrow().is_pending);
    }

    #[tokio::test]
    async fn subscribers_see_published_sessions() -> Result<()> {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.publish(Some(payload()));
        rx.changed().await?;
        {
            let state = rx.borrow_and_update();
            assert!(!state.is_pending);
            assert_eq!(
                state.data.as_ref().map(|p| p.user.name.as_str()),
                Some("Alice")
            );
        }

        store.clear();
        rx.changed().await?;
        assert_eq!(*rx.borrow(), SessionState::resolved(None));
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_keeps_state() {
        let store = SessionStore::new();
        store.publish(Some(payload()));
        assert!(store.current().data.is_some());
    }
}
