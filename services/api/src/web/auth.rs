//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and the current identity.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use testcase_core::ports::PortError;
use testcase_core::{SessionContext, User};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ErrorBody, HttpError};
use crate::web::middleware::bearer_token;
use crate::web::state::AppState;

const MIN_PASSWORD_CHARS: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is valid")
});

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The public view of a user. The credential hash never leaves the server.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserResponse,
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Checks a signup request and returns the normalized (name, email).
fn validate_signup(req: &SignupRequest) -> Result<(String, String), HttpError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(HttpError::bad_request("Name is required"));
    }
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(HttpError::bad_request("Email is required"));
    }
    if req.password.is_empty() {
        return Err(HttpError::bad_request("Password is required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(HttpError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    if !is_valid_email(&email) {
        return Err(HttpError::bad_request("Invalid email format"));
    }
    Ok((name.to_string(), email))
}

fn hash_password(password: &str) -> Result<String, HttpError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            HttpError::internal("An error occurred during signup")
        })
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, HttpError> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        HttpError::internal("An error occurred during login")
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn malformed_body(rejection: JsonRejection) -> HttpError {
    warn!("Rejected request body: {}", rejection.body_text());
    HttpError::bad_request("No data provided")
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = body.map_err(malformed_body)?;
    let (name, email) = validate_signup(&req)?;
    let password_hash = hash_password(&req.password)?;

    let user = state
        .users
        .create_user(&name, &email, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => {
                HttpError::new(StatusCode::CONFLICT, "Email already registered")
            }
            other => {
                error!("Failed to create user: {:?}", other);
                HttpError::internal("An error occurred during signup")
            }
        })?;

    let session = state
        .sessions
        .issue(user.id)
        .await
        .map_err(HttpError::from_port("Failed to create session"))?;

    info!(user_id = %user.id, "Account created");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Account created successfully".to_string(),
            user: user.into(),
            token: session.token,
        }),
    ))
}

/// POST /api/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(req) = body.map_err(malformed_body)?;
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(HttpError::bad_request("Email is required"));
    }
    if req.password.is_empty() {
        return Err(HttpError::bad_request("Password is required"));
    }

    // Unknown email and wrong password are indistinguishable to the caller.
    let credentials = state
        .users
        .get_user_by_email(&email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => HttpError::new(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS),
            other => {
                error!("Failed to get user: {:?}", other);
                HttpError::internal("An error occurred during login")
            }
        })?;

    if !verify_password(&req.password, &credentials.password_hash)? {
        return Err(HttpError::new(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS));
    }

    let user = credentials.user;
    let session = state
        .sessions
        .issue(user.id)
        .await
        .map_err(HttpError::from_port("Failed to create session"))?;

    info!(user_id = %user.id, "Login successful");
    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user: user.into(),
        token: session.token,
    }))
}

/// POST /api/logout - Invalidate the presented session token
///
/// Always succeeds; a missing or unknown token is simply ignored.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    security(("bearer" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<MessageResponse> {
    if let Some(token) = bearer_token(&headers) {
        if let Err(e) = state.sessions.revoke(token).await {
            error!("Failed to revoke session token: {:?}", e);
        }
    }
    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}

/// GET /api/me - The user behind the presented session token
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<MeResponse>, HttpError> {
    let user = state
        .users
        .get_user_by_id(session.user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => HttpError::unauthorized(),
            other => HttpError::from_port("Failed to load user")(other),
        })?;
    Ok(Json(MeResponse { user: user.into() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn signup_validation_normalizes_email() {
        let (name, email) =
            validate_signup(&signup("  Ada ", " Ada@Example.COM ", "secret1")).unwrap();
        assert_eq!(name, "Ada");
        assert_eq!(email, "ada@example.com");
    }

    #[test]
    fn signup_validation_rejects_bad_input() {
        for req in [
            signup("", "ada@example.com", "secret1"),
            signup("Ada", "   ", "secret1"),
            signup("Ada", "ada@example.com", ""),
            signup("Ada", "ada@example.com", "12345"),
            signup("Ada", "not-an-email", "secret1"),
            signup("Ada", "ada@example", "secret1"),
        ] {
            let err = validate_signup(&req).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn email_format_check() {
        assert!(is_valid_email("qa.lead+1@example.co.uk"));
        assert!(!is_valid_email("missing-at.example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@example.c"));
    }

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }
}
