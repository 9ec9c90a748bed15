//! crates/testcase_core/src/domain.rs
//!
//! Defines the core data structures for the application: users, sessions,
//! generation requests, test cases and the records that own them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

//=========================================================================================
// Users and Sessions
//=========================================================================================

/// Represents a user - used throughout the app. Never carries the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A bearer session issued at login or signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Closed Enumerations
//=========================================================================================

/// The kind of project the requirements describe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    #[default]
    Web,
    Mobile,
    #[serde(rename = "API")]
    Api,
    Desktop,
}

impl ProjectType {
    pub const ALL: [ProjectType; 4] = [
        ProjectType::Web,
        ProjectType::Mobile,
        ProjectType::Api,
        ProjectType::Desktop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Web => "Web",
            ProjectType::Mobile => "Mobile",
            ProjectType::Api => "API",
            ProjectType::Desktop => "Desktop",
        }
    }

    /// Matches a label case-insensitively against the known project types.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Unrecognized values degrade to `Low`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" | "p1" => Priority::High,
            "medium" | "med" | "normal" | "p2" => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Trivial,
}

impl Severity {
    /// Unrecognized values degrade to `Trivial`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" | "blocker" => Severity::Critical,
            "major" | "high" => Severity::Major,
            "minor" | "medium" => Severity::Minor,
            _ => Severity::Trivial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Major => "Major",
            Severity::Minor => "Minor",
            Severity::Trivial => "Trivial",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    Pass,
    Fail,
    #[default]
    Pending,
}

impl TestStatus {
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pass" | "passed" => TestStatus::Pass,
            "fail" | "failed" => TestStatus::Fail,
            _ => TestStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "Pass",
            TestStatus::Fail => "Fail",
            TestStatus::Pending => "Pending",
        }
    }
}

//=========================================================================================
// Test Cases
//=========================================================================================

/// The canonical unit produced by generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub test_id: String,
    pub module: String,
    pub test_scenario: String,
    pub preconditions: String,
    pub steps: String,
    pub test_data: String,
    pub expected_result: String,
    pub actual_result: String,
    pub status: TestStatus,
    pub priority: Priority,
    pub severity: Severity,
    pub edge_cases: String,
}

/// A test case as an engine returned it, before normalization.
///
/// Every field is optional and decoded leniently: strings, numbers and arrays
/// of strings are all accepted so that minor schema drift in engine output
/// degrades instead of failing the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DraftTestCase {
    #[serde(deserialize_with = "lenient_text")]
    pub test_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub module: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub test_scenario: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub preconditions: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub steps: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub test_data: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub expected_result: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub priority: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub severity: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub edge_cases: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    fn flatten(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Array(items) => {
                let parts: Vec<String> = items.into_iter().filter_map(flatten).collect();
                Some(parts.join("\n"))
            }
            other => Some(other.to_string()),
        }
    }

    Ok(flatten(Value::deserialize(deserializer)?))
}

/// What an engine hands back for one generation call.
#[derive(Debug, Clone, Default)]
pub struct GeneratedSuite {
    pub cases: Vec<DraftTestCase>,
    pub note: Option<String>,
}

/// Counts of test cases by priority. Always computed from the test cases, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl Summary {
    pub fn of(cases: &[TestCase]) -> Self {
        cases.iter().fold(
            Summary {
                total: cases.len(),
                ..Summary::default()
            },
            |mut summary, case| {
                match case.priority {
                    Priority::High => summary.high += 1,
                    Priority::Medium => summary.medium += 1,
                    Priority::Low => summary.low += 1,
                }
                summary
            },
        )
    }
}

//=========================================================================================
// Generation Requests and Records
//=========================================================================================

/// A document uploaded alongside (or instead of) the requirements text.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Transient input to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub requirements: String,
    pub project_type: ProjectType,
    pub provider: Option<String>,
    pub file: Option<UploadedFile>,
}

/// One persisted generation result, exclusively owned by `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: Uuid,
    pub owner: Uuid,
    pub filename: String,
    pub requirements: String,
    pub project_type: ProjectType,
    pub provider_used: String,
    pub note: Option<String>,
    pub test_cases: Vec<TestCase>,
    pub created_at: DateTime<Utc>,
}

impl GenerationRecord {
    pub fn summary(&self) -> Summary {
        Summary::of(&self.test_cases)
    }

    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            filename: self.filename.clone(),
            project_type: self.project_type,
            created_at: self.created_at,
        }
    }
}

/// The lightweight projection returned when listing a user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub filename: String,
    pub project_type: ProjectType,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Providers and Exports
//=========================================================================================

/// Describes a generation engine to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Spreadsheet,
    DelimitedText,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "xlsx",
            ExportFormat::DelimitedText => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::DelimitedText => "text/csv",
        }
    }

    /// Parses the path segment used by the download routes.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "excel" | "xlsx" | "spreadsheet" => Some(ExportFormat::Spreadsheet),
            "csv" | "delimited" => Some(ExportFormat::DelimitedText),
            _ => None,
        }
    }

    /// The name used when a renderer does not suggest one.
    pub fn default_filename(&self, record_id: Uuid) -> String {
        format!("test_cases_{}.{}", record_id, self.extension())
    }
}
