//! crates/testcase_client/src/session.rs
//!
//! Client-side session state and where its token is kept.

use std::sync::{Arc, RwLock};

/// Persists the bearer token between calls (and, for implementations backed
/// by disk or a keychain, between runs).
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Option<String>;

    fn save(&self, token: &str);

    fn clear(&self);
}

/// Keeps the token for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: RwLock<Option<String>>,
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, token: &str) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

/// The signed-in state of one client user.
#[derive(Clone)]
pub struct ClientSession {
    storage: Arc<dyn TokenStorage>,
}

impl ClientSession {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::default()))
    }

    pub fn token(&self) -> Option<String> {
        self.storage.load()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub(crate) fn set_token(&self, token: &str) {
        self.storage.save(token);
    }

    /// Forgets the token locally without contacting the server.
    pub fn clear(&self) {
        self.storage.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_share_their_storage() {
        let storage = Arc::new(MemoryTokenStorage::default());
        let session = ClientSession::new(storage.clone());
        assert!(!session.is_authenticated());

        session.set_token("abc");
        assert_eq!(storage.load().as_deref(), Some("abc"));
        assert_eq!(session.clone().token().as_deref(), Some("abc"));

        session.clear();
        assert!(storage.load().is_none());
    }
}
