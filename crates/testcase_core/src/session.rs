//! crates/testcase_core/src/session.rs
//!
//! The session manager issues, validates and revokes bearer tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::AuthSession;
use crate::ports::{PortResult, TokenStore};

const TOKEN_BYTES: usize = 32;

/// Why a token was rejected. Both variants surface to clients as the same
/// unauthorized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("session token is missing, malformed or unknown")]
    Invalid,
    #[error("session token has expired")]
    Expired,
}

/// The identity a validated token resolves to, passed explicitly to the
/// operations that act on behalf of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub token: String,
    pub user_id: Uuid,
}

pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a fresh token. Earlier tokens of the same user stay valid.
    pub async fn issue(&self, user_id: Uuid) -> PortResult<AuthSession> {
        self.issue_at(user_id, Utc::now()).await
    }

    pub async fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> PortResult<AuthSession> {
        let session = AuthSession {
            token: generate_token(),
            user_id,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        self.store.insert_session(session.clone()).await?;
        debug!(%user_id, "Issued session token");
        Ok(session)
    }

    pub async fn validate(&self, token: &str) -> Result<SessionContext, AuthError> {
        self.validate_at(token, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionContext, AuthError> {
        if !is_well_formed(token) {
            return Err(AuthError::Invalid);
        }

        let session = self
            .store
            .find_session(token)
            .await
            .map_err(|e| {
                error!("Failed to look up session token: {:?}", e);
                AuthError::Invalid
            })?
            .ok_or(AuthError::Invalid)?;

        if session.expires_at <= now {
            // Expired entries are dropped on sight; later lookups see an unknown token.
            if let Err(e) = self.store.remove_session(token).await {
                warn!("Failed to remove expired session token: {:?}", e);
            }
            return Err(AuthError::Expired);
        }

        Ok(SessionContext {
            token: session.token,
            user_id: session.user_id,
        })
    }

    /// Idempotent: revoking an unknown or already revoked token succeeds.
    pub async fn revoke(&self, token: &str) -> PortResult<()> {
        if !is_well_formed(token) {
            return Ok(());
        }
        self.store.remove_session(token).await
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTokenStore;

    fn manager(ttl: Duration) -> SessionManager {
        SessionManager::new(Arc::new(InMemoryTokenStore::default()), ttl)
    }

    #[tokio::test]
    async fn issued_token_validates_to_its_user() {
        let sessions = manager(Duration::hours(24));
        let user_id = Uuid::new_v4();
        let issued = sessions.issue(user_id).await.unwrap();

        assert_eq!(issued.token.len(), 64);
        assert_eq!(issued.expires_at - issued.issued_at, Duration::hours(24));

        let ctx = sessions.validate(&issued.token).await.unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.token, issued.token);
    }

    #[tokio::test]
    async fn multiple_sessions_per_user_coexist() {
        let sessions = manager(Duration::hours(1));
        let user_id = Uuid::new_v4();
        let first = sessions.issue(user_id).await.unwrap();
        let second = sessions.issue(user_id).await.unwrap();

        assert_ne!(first.token, second.token);
        assert!(sessions.validate(&first.token).await.is_ok());
        assert!(sessions.validate(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn revoked_token_is_invalid_and_revoke_is_idempotent() {
        let sessions = manager(Duration::hours(1));
        let issued = sessions.issue(Uuid::new_v4()).await.unwrap();

        sessions.revoke(&issued.token).await.unwrap();
        sessions.revoke(&issued.token).await.unwrap();
        sessions.revoke("not-a-token").await.unwrap();

        assert_eq!(
            sessions.validate(&issued.token).await,
            Err(AuthError::Invalid)
        );
    }

    #[tokio::test]
    async fn token_past_expiry_is_expired_and_removed() {
        let store = Arc::new(InMemoryTokenStore::default());
        let sessions = SessionManager::new(store.clone(), Duration::minutes(30));
        let issued_at = Utc::now() - Duration::hours(1);
        let issued = sessions.issue_at(Uuid::new_v4(), issued_at).await.unwrap();

        assert!(sessions
            .validate_at(&issued.token, issued_at + Duration::minutes(29))
            .await
            .is_ok());
        assert_eq!(
            sessions.validate(&issued.token).await,
            Err(AuthError::Expired)
        );
        assert!(store.find_session(&issued.token).await.unwrap().is_none());
        assert_eq!(
            sessions.validate(&issued.token).await,
            Err(AuthError::Invalid)
        );
    }

    #[tokio::test]
    async fn malformed_and_unknown_tokens_are_invalid() {
        let sessions = manager(Duration::hours(1));
        assert_eq!(sessions.validate("").await, Err(AuthError::Invalid));
        assert_eq!(sessions.validate("abc").await, Err(AuthError::Invalid));
        let unknown = "a".repeat(64);
        assert_eq!(sessions.validate(&unknown).await, Err(AuthError::Invalid));
    }
}
