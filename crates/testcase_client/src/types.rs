//! crates/testcase_client/src/types.rs
//!
//! Request and response bodies of the HTTP API as seen by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use testcase_core::{HistoryEntry, ProjectType, ProviderInfo, Summary, TestCase, User};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
    pub default: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateBody<'a> {
    pub requirements: &'a str,
    pub project_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_provider: Option<&'a str>,
}

/// A stored generation record.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResult {
    pub id: Uuid,
    pub filename: String,
    pub requirements: String,
    pub project_type: ProjectType,
    pub provider: String,
    #[serde(default)]
    pub note: Option<String>,
    pub test_cases: Vec<TestCase>,
    pub summary: Summary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
