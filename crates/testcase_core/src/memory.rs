//! crates/testcase_core/src/memory.rs
//!
//! In-process implementations of the storage ports. Used when no database is
//! configured and as the backing stores in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::{AuthSession, GenerationRecord, HistoryEntry, User, UserCredentials};
use crate::ports::{PortError, PortResult, RecordStore, TokenStore, UserStore, HISTORY_LIMIT};

//=========================================================================================
// Users
//=========================================================================================

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, UserCredentials>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> PortResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|c| c.user.email == email) {
            return Err(PortError::Conflict(format!("Email {} already registered", email)));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.users
            .read()
            .await
            .values()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }
}

//=========================================================================================
// Session Tokens
//=========================================================================================

#[derive(Default)]
pub struct InMemoryTokenStore {
    sessions: RwLock<HashMap<String, AuthSession>>,
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert_session(&self, session: AuthSession) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> PortResult<Option<AuthSession>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn remove_session(&self, token: &str) -> PortResult<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }
}

//=========================================================================================
// Generation Records
//=========================================================================================

type History = Arc<Mutex<VecDeque<GenerationRecord>>>;

/// Each owner gets their own lock, so writers for different users never wait
/// on each other and appends for one user are totally ordered.
#[derive(Default)]
pub struct InMemoryRecordStore {
    histories: RwLock<HashMap<Uuid, History>>,
}

impl InMemoryRecordStore {
    async fn history(&self, owner: Uuid) -> Option<History> {
        self.histories.read().await.get(&owner).cloned()
    }

    async fn history_or_create(&self, owner: Uuid) -> History {
        if let Some(history) = self.history(owner).await {
            return history;
        }
        self.histories
            .write()
            .await
            .entry(owner)
            .or_default()
            .clone()
    }
}

fn not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("Record {} not found", id))
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, owner: Uuid, record: GenerationRecord) -> PortResult<()> {
        if record.owner != owner {
            return Err(PortError::Unexpected(format!(
                "Record {} is not owned by {}",
                record.id, owner
            )));
        }
        let history = self.history_or_create(owner).await;
        history.lock().await.push_front(record);
        Ok(())
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> PortResult<GenerationRecord> {
        let history = self.history(owner).await.ok_or_else(|| not_found(id))?;
        let records = history.lock().await;
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn list(&self, owner: Uuid) -> PortResult<Vec<HistoryEntry>> {
        let Some(history) = self.history(owner).await else {
            return Ok(Vec::new());
        };
        let records = history.lock().await;
        Ok(records
            .iter()
            .take(HISTORY_LIMIT)
            .map(GenerationRecord::history_entry)
            .collect())
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> PortResult<()> {
        let history = self.history(owner).await.ok_or_else(|| not_found(id))?;
        let mut records = history.lock().await;
        let position = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found(id))?;
        records.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectType;

    fn record(owner: Uuid, filename: &str) -> GenerationRecord {
        GenerationRecord {
            id: Uuid::new_v4(),
            owner,
            filename: filename.to_string(),
            requirements: String::new(),
            project_type: ProjectType::Web,
            provider_used: "mock".to_string(),
            note: None,
            test_cases: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn list_is_most_recent_first() {
        let store = InMemoryRecordStore::default();
        let owner = Uuid::new_v4();
        store.append(owner, record(owner, "first")).await.unwrap();
        store.append(owner, record(owner, "second")).await.unwrap();

        let names: Vec<String> = store
            .list(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.filename)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn foreign_and_missing_ids_are_indistinguishable() {
        let store = InMemoryRecordStore::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let owned = record(alice, "alice.txt");
        let id = owned.id;
        store.append(alice, owned).await.unwrap();

        assert!(matches!(store.get(bob, id).await, Err(PortError::NotFound(_))));
        assert!(matches!(
            store.get(bob, Uuid::new_v4()).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(store.delete(bob, id).await, Err(PortError::NotFound(_))));
        assert!(store.list(bob).await.unwrap().is_empty());
        assert!(store.get(alice, id).await.is_ok());
    }

    #[tokio::test]
    async fn second_delete_reports_not_found() {
        let store = InMemoryRecordStore::default();
        let owner = Uuid::new_v4();
        let r = record(owner, "doomed");
        let id = r.id;
        store.append(owner, r).await.unwrap();

        store.delete(owner, id).await.unwrap();
        assert!(matches!(store.delete(owner, id).await, Err(PortError::NotFound(_))));
        assert!(store.list(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_rejects_mismatched_owner() {
        let store = InMemoryRecordStore::default();
        let r = record(Uuid::new_v4(), "x");
        assert!(store.append(Uuid::new_v4(), r).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_appends_keep_every_record() {
        let store = Arc::new(InMemoryRecordStore::default());
        let owner = Uuid::new_v4();

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .append(owner, record(owner, &format!("r{}", i)))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list(owner).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn history_is_capped() {
        let store = InMemoryRecordStore::default();
        let owner = Uuid::new_v4();
        for i in 0..(HISTORY_LIMIT + 5) {
            store
                .append(owner, record(owner, &format!("r{}", i)))
                .await
                .unwrap();
        }
        assert_eq!(store.list(owner).await.unwrap().len(), HISTORY_LIMIT);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let users = InMemoryUserStore::default();
        let created = users.create_user("Ann", "ann@example.com", "hash").await.unwrap();
        assert!(matches!(
            users.create_user("Ann", "ann@example.com", "hash").await,
            Err(PortError::Conflict(_))
        ));

        let creds = users.get_user_by_email("ann@example.com").await.unwrap();
        assert_eq!(creds.user, created);
        assert_eq!(creds.password_hash, "hash");
        assert_eq!(users.get_user_by_id(created.id).await.unwrap(), created);
    }
}
