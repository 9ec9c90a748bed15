//! services/api/src/error.rs
//!
//! Defines the startup error type for the API service and the error type
//! returned by HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use testcase_core::{AuthError, ExportError, GenerationFault, PortError};
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for starting the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while applying database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//=========================================================================================
// HTTP Errors
//=========================================================================================

/// The JSON body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// An error response: a status code plus a short, user-facing message.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The single response used for every authentication failure.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "File not found")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Logs a port failure and hides its detail behind a generic 500.
    pub fn from_port(context: &'static str) -> impl FnOnce(PortError) -> Self {
        move |e| {
            error!("{}: {:?}", context, e);
            Self::internal(context)
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for HttpError {
    fn from(_: AuthError) -> Self {
        Self::unauthorized()
    }
}

impl From<GenerationFault> for HttpError {
    fn from(fault: GenerationFault) -> Self {
        let status = match fault {
            GenerationFault::EmptyInput | GenerationFault::UnknownProvider(_) => {
                StatusCode::BAD_REQUEST
            }
            GenerationFault::ExtractionFailed => StatusCode::UNPROCESSABLE_ENTITY,
            GenerationFault::EngineError(_) => StatusCode::BAD_GATEWAY,
            GenerationFault::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GenerationFault::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
            GenerationFault::SessionEnded => return Self::unauthorized(),
        };
        Self::new(status, fault.to_string())
    }
}

impl From<ExportError> for HttpError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::NotFound => Self::not_found(),
            ExportError::Render(_) => Self::internal(err.to_string()),
            ExportError::Storage => Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testcase_core::ExportFormat;

    #[test]
    fn generation_faults_map_to_statuses() {
        let cases = [
            (GenerationFault::EmptyInput, StatusCode::BAD_REQUEST),
            (
                GenerationFault::UnknownProvider("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GenerationFault::ExtractionFailed,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                GenerationFault::EngineError("groq".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (GenerationFault::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (
                GenerationFault::StorageError,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (GenerationFault::SessionEnded, StatusCode::UNAUTHORIZED),
        ];
        for (fault, status) in cases {
            assert_eq!(HttpError::from(fault).status(), status);
        }
    }

    #[test]
    fn auth_errors_are_uniform() {
        let invalid = HttpError::from(AuthError::Invalid);
        let expired = HttpError::from(AuthError::Expired);
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.message, expired.message);
    }

    #[test]
    fn export_errors_map_to_statuses() {
        assert_eq!(
            HttpError::from(ExportError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::from(ExportError::Render(ExportFormat::Spreadsheet)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
