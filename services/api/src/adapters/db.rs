//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the storage ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use testcase_core::domain::{
    AuthSession, GenerationRecord, HistoryEntry, ProjectType, TestCase, User, UserCredentials,
};
use testcase_core::ports::{
    PortError, PortResult, RecordStore, TokenStore, UserStore, HISTORY_LIMIT,
};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `UserStore`, `TokenStore` and `RecordStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}
impl UserRow {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                name: self.name,
                email: self.email,
                created_at: self.created_at,
            },
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRow {
    token: String,
    user_id: Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRow {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            token: self.token,
            user_id: self.user_id,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct GeneratedFileRow {
    id: Uuid,
    user_id: Uuid,
    filename: String,
    requirements: String,
    project_type: String,
    provider_used: String,
    note: Option<String>,
    test_cases: Json<Vec<TestCase>>,
    created_at: DateTime<Utc>,
}
impl GeneratedFileRow {
    fn to_domain(self) -> GenerationRecord {
        GenerationRecord {
            id: self.id,
            owner: self.user_id,
            filename: self.filename,
            requirements: self.requirements,
            project_type: ProjectType::from_label(&self.project_type).unwrap_or_default(),
            provider_used: self.provider_used,
            note: self.note,
            test_cases: self.test_cases.0,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct HistoryRow {
    id: Uuid,
    filename: String,
    project_type: String,
    created_at: DateTime<Utc>,
}
impl HistoryRow {
    fn to_domain(self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            filename: self.filename,
            project_type: ProjectType::from_label(&self.project_type).unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> PortResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Email {} already registered", email))
            }
            other => unexpected(other),
        })?;
        Ok(row.to_domain().user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))?;
        Ok(row.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(row.to_domain().user)
    }
}

//=========================================================================================
// `TokenStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TokenStore for DbAdapter {
    async fn insert_session(&self, session: AuthSession) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO auth_sessions (token, user_id, issued_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> PortResult<Option<AuthSession>> {
        let row = sqlx::query_as::<_, AuthSessionRow>(
            "SELECT token, user_id, issued_at, expires_at FROM auth_sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(AuthSessionRow::to_domain))
    }

    async fn remove_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `RecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for DbAdapter {
    async fn append(&self, owner: Uuid, record: GenerationRecord) -> PortResult<()> {
        if record.owner != owner {
            return Err(PortError::Unexpected(format!(
                "Record {} is not owned by {}",
                record.id, owner
            )));
        }

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Serializes appends per owner for the lifetime of the transaction.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(owner)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO generated_files \
             (id, user_id, filename, requirements, project_type, provider_used, note, test_cases, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id)
        .bind(owner)
        .bind(&record.filename)
        .bind(&record.requirements)
        .bind(record.project_type.as_str())
        .bind(&record.provider_used)
        .bind(&record.note)
        .bind(Json(&record.test_cases))
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> PortResult<GenerationRecord> {
        let row = sqlx::query_as::<_, GeneratedFileRow>(
            "SELECT id, user_id, filename, requirements, project_type, provider_used, note, test_cases, created_at \
             FROM generated_files WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Record {} not found", id)))?;
        Ok(row.to_domain())
    }

    async fn list(&self, owner: Uuid) -> PortResult<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, filename, project_type, created_at FROM generated_files \
             WHERE user_id = $1 ORDER BY seq DESC LIMIT $2",
        )
        .bind(owner)
        .bind(HISTORY_LIMIT as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(rows.into_iter().map(HistoryRow::to_domain).collect())
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM generated_files WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Record {} not found", id)));
        }
        Ok(())
    }
}
