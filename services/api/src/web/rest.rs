//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the generation, history and export
//! endpoints, and the master definition for the OpenAPI specification.

use crate::error::{ErrorBody, HttpError};
use crate::web::auth::{
    self, AuthResponse, LoginRequest, MeResponse, MessageResponse, SignupRequest, UserResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use testcase_core::ports::PortError;
use testcase_core::{
    ExportFormat, GenerationRecord, GenerationRequest, HistoryEntry, ProjectType, ProviderInfo,
    SessionContext, Summary, TestCase, UploadedFile,
};
use tracing::{error, info};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        health_handler,
        list_providers_handler,
        generate_handler,
        get_record_handler,
        download_handler,
        list_history_handler,
        delete_record_handler,
    ),
    components(
        schemas(
            SignupRequest, LoginRequest, AuthResponse, UserResponse, MeResponse,
            MessageResponse, ErrorBody, GenerateBody, RecordResponse, HistoryResponse,
            ProvidersResponse, HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Test Case Generator API", description = "Generate, store and export test cases from requirements.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The JSON form of a generation request.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateBody {
    #[serde(default)]
    pub requirements: String,
    /// One of `Web`, `Mobile`, `API`, `Desktop`; anything else means `Web`.
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub ai_provider: Option<String>,
}

/// A stored generation record as returned to its owner.
#[derive(Serialize, ToSchema)]
pub struct RecordResponse {
    pub id: Uuid,
    pub filename: String,
    pub requirements: String,
    #[schema(value_type = String, example = "Web")]
    pub project_type: ProjectType,
    /// The id of the engine that produced the test cases.
    pub provider: String,
    pub note: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub test_cases: Vec<TestCase>,
    #[schema(value_type = Object)]
    pub summary: Summary,
    pub created_at: DateTime<Utc>,
}

impl From<GenerationRecord> for RecordResponse {
    fn from(record: GenerationRecord) -> Self {
        let summary = record.summary();
        Self {
            id: record.id,
            filename: record.filename,
            requirements: record.requirements,
            project_type: record.project_type,
            provider: record.provider_used,
            note: record.note,
            test_cases: record.test_cases,
            summary,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ProvidersResponse {
    #[schema(value_type = Vec<Object>)]
    pub providers: Vec<ProviderInfo>,
    pub default: String,
}

//=========================================================================================
// Generation Request Extractor
//=========================================================================================

/// Reads a generation request from either a JSON body or a multipart form
/// with `file`, `requirements`, `project_type` and `ai_provider` parts.
pub struct GenerateInput(pub GenerationRequest);

impl<S> FromRequest<S> for GenerateInput
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| HttpError::bad_request(e.body_text()))?;
            return read_multipart(multipart).await.map(GenerateInput);
        }

        let Json(body) = Json::<GenerateBody>::from_request(req, state)
            .await
            .map_err(|e| HttpError::new(e.status(), e.body_text()))?;
        Ok(GenerateInput(GenerationRequest {
            requirements: body.requirements,
            project_type: parse_project_type(body.project_type.as_deref()),
            provider: body.ai_provider,
            file: None,
        }))
    }
}

fn parse_project_type(label: Option<&str>) -> ProjectType {
    label.and_then(ProjectType::from_label).unwrap_or_default()
}

async fn read_multipart(mut multipart: Multipart) -> Result<GenerationRequest, HttpError> {
    let mut body = GenerateBody::default();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::new(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| HttpError::new(e.status(), e.body_text()))?;
                // Browsers send an empty part when no file was chosen.
                if !filename.is_empty() || !bytes.is_empty() {
                    file = Some(UploadedFile {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "requirements" | "project_type" | "ai_provider" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| HttpError::new(e.status(), e.body_text()))?;
                match name.as_str() {
                    "requirements" => body.requirements = value,
                    "project_type" => body.project_type = Some(value),
                    _ => body.ai_provider = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok(GenerationRequest {
        requirements: body.requirements,
        project_type: parse_project_type(body.project_type.as_deref()),
        provider: body.ai_provider,
        file,
    })
}

/// Ids that do not parse cannot name a record, so they are simply not found.
fn parse_record_id(raw: &str) -> Result<Uuid, HttpError> {
    Uuid::parse_str(raw).map_err(|_| HttpError::not_found())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check for load balancers and the web client.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "The service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Test Case Generator API is running".to_string(),
    })
}

/// List the generation engines that can be requested.
#[utoipa::path(
    get,
    path = "/api/providers",
    responses(
        (status = 200, description = "Available providers and the effective default", body = ProvidersResponse)
    )
)]
pub async fn list_providers_handler(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    let registry = state.orchestrator.providers();
    Json(ProvidersResponse {
        providers: registry.available(),
        default: registry.default_id(),
    })
}

/// Generate test cases from requirements text and/or an uploaded document.
#[utoipa::path(
    post,
    path = "/api/generate",
    request_body(
        content = GenerateBody,
        description = "JSON, or multipart/form-data with `file`, `requirements`, `project_type` and `ai_provider` parts."
    ),
    responses(
        (status = 200, description = "Test cases generated and saved", body = RecordResponse),
        (status = 400, description = "Missing input or unknown provider", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 422, description = "The uploaded document could not be read", body = ErrorBody),
        (status = 502, description = "The AI provider failed", body = ErrorBody),
        (status = 504, description = "Generation timed out", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    GenerateInput(request): GenerateInput,
) -> Result<Json<RecordResponse>, HttpError> {
    let record = state.orchestrator.submit(request, &session).await?;
    Ok(Json(record.into()))
}

/// Fetch one of the caller's generation records.
#[utoipa::path(
    get,
    path = "/api/generate/{id}",
    params(("id" = Uuid, Path, description = "The record id.")),
    responses(
        (status = 200, description = "The record", body = RecordResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "File not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn get_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, HttpError> {
    let id = parse_record_id(&id)?;
    let record = state
        .records
        .get(session.user_id, id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => HttpError::not_found(),
            other => HttpError::from_port("Failed to load record")(other),
        })?;
    Ok(Json(record.into()))
}

/// Download a record's test cases as a spreadsheet (`excel`/`xlsx`) or `csv`.
#[utoipa::path(
    get,
    path = "/api/download/{format}/{id}",
    params(
        ("format" = String, Path, description = "`excel`, `xlsx` or `csv`."),
        ("id" = Uuid, Path, description = "The record id.")
    ),
    responses(
        (status = 200, description = "The rendered file as an attachment"),
        (status = 400, description = "Unsupported format", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 500, description = "Rendering failed", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path((format, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, HttpError> {
    let format = ExportFormat::from_segment(&format)
        .ok_or_else(|| HttpError::bad_request(format!("Unsupported export format: {}", format)))?;
    let id = parse_record_id(&id)?;

    let file = state.exports.export(session.user_id, id, format).await?;
    info!(record_id = %id, ?format, bytes = file.bytes.len(), "Export rendered");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    ))
}

/// List the caller's most recent generation records.
#[utoipa::path(
    get,
    path = "/api/history",
    responses(
        (status = 200, description = "Most recent first", body = HistoryResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<HistoryResponse>, HttpError> {
    let history = state
        .records
        .list(session.user_id)
        .await
        .map_err(HttpError::from_port("Failed to load history"))?;
    Ok(Json(HistoryResponse { history }))
}

/// Delete one of the caller's generation records.
#[utoipa::path(
    delete,
    path = "/api/history/{id}",
    params(("id" = Uuid, Path, description = "The record id.")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "File not found", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, HttpError> {
    let id = parse_record_id(&id)?;
    state
        .records
        .delete(session.user_id, id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => HttpError::not_found(),
            other => {
                error!(record_id = %id, "Failed to delete record: {:?}", other);
                HttpError::internal("Failed to delete file")
            }
        })?;
    info!(record_id = %id, "Record deleted");
    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}
