//! crates/testcase_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases,
//! document parsers, AI providers or file renderers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AuthSession, ExportFormat, GeneratedSuite, GenerationRecord, HistoryEntry, ProjectType,
    ProviderInfo, TestCase, UploadedFile, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `PortError::Conflict` when the email is already registered.
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;
}

/// Backing table for session tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_session(&self, session: AuthSession) -> PortResult<()>;

    async fn find_session(&self, token: &str) -> PortResult<Option<AuthSession>>;

    /// Removing an unknown token is not an error.
    async fn remove_session(&self, token: &str) -> PortResult<()>;
}

/// Per-user history of generation records.
///
/// Ownership is part of every lookup: asking for a record that exists but
/// belongs to somebody else yields exactly the same `PortError::NotFound` as
/// asking for an id that was never issued, so callers cannot probe for the
/// existence of other users' records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Appends are serialized per owner; `record.owner` must equal `owner`.
    async fn append(&self, owner: Uuid, record: GenerationRecord) -> PortResult<()>;

    async fn get(&self, owner: Uuid, id: Uuid) -> PortResult<GenerationRecord>;

    /// Most recent first, capped at `HISTORY_LIMIT` entries.
    async fn list(&self, owner: Uuid) -> PortResult<Vec<HistoryEntry>>;

    /// Not idempotent: deleting twice reports `NotFound` the second time.
    async fn delete(&self, owner: Uuid, id: Uuid) -> PortResult<()>;
}

/// Maximum number of entries returned by `RecordStore::list`.
pub const HISTORY_LIMIT: usize = 50;

//=========================================================================================
// Collaborator Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Converts an uploaded PDF, DOCX or plain-text file into text.
    async fn extract(&self, file: &UploadedFile) -> PortResult<String>;
}

#[async_trait]
pub trait TestCaseGenerator: Send + Sync {
    fn info(&self) -> ProviderInfo;

    /// Whether the engine is configured well enough to be used as a default.
    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, text: &str, project_type: ProjectType) -> PortResult<GeneratedSuite>;
}

/// A rendered export artifact.
#[derive(Debug, Clone)]
pub struct RenderedExport {
    pub bytes: Vec<u8>,
    /// Overrides the default `test_cases_<id>.<ext>` name when set.
    pub filename: Option<String>,
}

pub trait ExportRenderer: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn render(&self, cases: &[TestCase]) -> PortResult<RenderedExport>;
}
