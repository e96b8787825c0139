use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque bearer token handed to the client after login.
pub type SessionToken = Uuid;

/// One browser's authenticated status. Holds a back-reference to the user
/// record, never the record itself.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub user_id: u32,
    pub established_at: OffsetDateTime,
}

/// Process-local session registry. Sessions do not survive a restart.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<SessionToken, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn establish(&self, user_id: u32) -> SessionToken {
        let token = Uuid::new_v4();
        let session = Session {
            user_id,
            established_at: OffsetDateTime::now_utc(),
        };
        self.inner
            .write()
            .expect("session store lock poisoned")
            .insert(token, session);
        token
    }

    pub fn get(&self, token: &SessionToken) -> Option<Session> {
        self.inner
            .read()
            .expect("session store lock poisoned")
            .get(token)
            .copied()
    }

    /// Removes the session; revoking an unknown token is a no-op.
    pub fn revoke(&self, token: &SessionToken) -> Option<Session> {
        self.inner
            .write()
            .expect("session store lock poisoned")
            .remove(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn establish_and_get_roundtrip() {
        let store = SessionStore::new();
        let token = store.establish(7);
        let session = store.get(&token).expect("session present");
        assert_eq!(session.user_id, 7);
    }

    #[test]
    fn tokens_are_unique_per_session() {
        let store = SessionStore::new();
        assert_ne!(store.establish(1), store.establish(1));
    }

    #[test]
    fn revoke_is_idempotent() {
        let store = SessionStore::new();
        let token = store.establish(1);
        assert!(store.revoke(&token).is_some());
        assert!(store.revoke(&token).is_none());
        assert!(store.get(&token).is_none());
    }
}
