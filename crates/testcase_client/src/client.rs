//! crates/testcase_client/src/client.rs

use std::time::Duration;

use reqwest::{header, multipart, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use testcase_core::{ExportFormat, HistoryEntry, ProjectType, User};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::session::ClientSession;
use crate::types::{
    AuthResponse, ErrorBody, GenerateBody, GenerationResult, HistoryResponse, LoginRequest,
    MeResponse, MessageResponse, ProvidersResponse, SignupRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server rejected the session, or there was none. The local token
    /// has been cleared and the user must sign in again.
    #[error("not signed in")]
    Unauthorized,
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// What to generate test cases from.
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    pub requirements: String,
    pub project_type: ProjectType,
    /// `None` lets the server pick its default provider.
    pub ai_provider: Option<String>,
}

/// A downloaded export.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Typed HTTP client for the test case generator API.
///
/// The client itself holds no user state; every authenticated call takes the
/// `ClientSession` it acts for.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client with the given base URL and timeout.
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Sends an authenticated request. A 401 signs the session out.
    async fn send_authed(
        &self,
        session: &ClientSession,
        request: RequestBuilder,
    ) -> ClientResult<reqwest::Response> {
        let token = session.token().ok_or(ClientError::Unauthorized)?;
        let resp = request.bearer_auth(token).send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!("Session rejected by the server; signing out");
            session.clear();
            return Err(ClientError::Unauthorized);
        }
        Ok(resp)
    }

    // ── Auth ──────────────────────────────────────────────────────────────

    pub async fn signup(
        &self,
        session: &ClientSession,
        name: &str,
        email: &str,
        password: &str,
    ) -> ClientResult<User> {
        let resp = self
            .client
            .post(self.url("/signup"))
            .json(&SignupRequest {
                name,
                email,
                password,
            })
            .send()
            .await?;
        let auth: AuthResponse = parse_response(resp).await?;
        session.set_token(&auth.token);
        Ok(auth.user)
    }

    pub async fn login(
        &self,
        session: &ClientSession,
        email: &str,
        password: &str,
    ) -> ClientResult<User> {
        let resp = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let auth: AuthResponse = parse_response(resp).await?;
        session.set_token(&auth.token);
        Ok(auth.user)
    }

    /// Ends the session on the server when possible and always forgets it locally.
    pub async fn logout(&self, session: &ClientSession) -> ClientResult<()> {
        let token = session.token();
        session.clear();

        let mut request = self.client.post(self.url("/logout"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        match request.send().await {
            Ok(resp) if !resp.status().is_success() => {
                debug!(status = %resp.status(), "Server-side logout was not acknowledged");
            }
            Ok(_) => {}
            Err(e) => debug!("Server-side logout failed: {}", e),
        }
        Ok(())
    }

    pub async fn me(&self, session: &ClientSession) -> ClientResult<User> {
        let resp = self
            .send_authed(session, self.client.get(self.url("/me")))
            .await?;
        let me: MeResponse = parse_response(resp).await?;
        Ok(me.user)
    }

    // ── Generation ────────────────────────────────────────────────────────

    pub async fn providers(&self) -> ClientResult<ProvidersResponse> {
        let resp = self.client.get(self.url("/providers")).send().await?;
        parse_response(resp).await
    }

    pub async fn generate_text(
        &self,
        session: &ClientSession,
        params: &GenerateParams,
    ) -> ClientResult<GenerationResult> {
        let body = GenerateBody {
            requirements: &params.requirements,
            project_type: params.project_type.as_str(),
            ai_provider: params.ai_provider.as_deref(),
        };
        let resp = self
            .send_authed(session, self.client.post(self.url("/generate")).json(&body))
            .await?;
        parse_response(resp).await
    }

    /// Uploads a PDF, DOCX or text document; its text takes precedence over
    /// `params.requirements`.
    pub async fn generate_with_file(
        &self,
        session: &ClientSession,
        params: &GenerateParams,
        filename: &str,
        bytes: Vec<u8>,
    ) -> ClientResult<GenerationResult> {
        let mut form = multipart::Form::new()
            .text("requirements", params.requirements.clone())
            .text("project_type", params.project_type.as_str())
            .part(
                "file",
                multipart::Part::bytes(bytes).file_name(filename.to_string()),
            );
        if let Some(provider) = &params.ai_provider {
            form = form.text("ai_provider", provider.clone());
        }
        let resp = self
            .send_authed(
                session,
                self.client.post(self.url("/generate")).multipart(form),
            )
            .await?;
        parse_response(resp).await
    }

    pub async fn get_record(
        &self,
        session: &ClientSession,
        id: Uuid,
    ) -> ClientResult<GenerationResult> {
        let resp = self
            .send_authed(
                session,
                self.client.get(self.url(&format!("/generate/{}", id))),
            )
            .await?;
        parse_response(resp).await
    }

    // ── Export & History ──────────────────────────────────────────────────

    pub async fn export(
        &self,
        session: &ClientSession,
        id: Uuid,
        format: ExportFormat,
    ) -> ClientResult<DownloadedFile> {
        let segment = match format {
            ExportFormat::Spreadsheet => "excel",
            ExportFormat::DelimitedText => "csv",
        };
        let resp = self
            .send_authed(
                session,
                self.client
                    .get(self.url(&format!("/download/{}/{}", segment, id))),
            )
            .await?;
        let resp = check_status(resp).await?;

        let filename = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or_else(|| format.default_filename(id));
        let bytes = resp.bytes().await?.to_vec();
        Ok(DownloadedFile { filename, bytes })
    }

    pub async fn history(&self, session: &ClientSession) -> ClientResult<Vec<HistoryEntry>> {
        let resp = self
            .send_authed(session, self.client.get(self.url("/history")))
            .await?;
        let history: HistoryResponse = parse_response(resp).await?;
        Ok(history.history)
    }

    pub async fn delete(&self, session: &ClientSession, id: Uuid) -> ClientResult<()> {
        let resp = self
            .send_authed(
                session,
                self.client.delete(self.url(&format!("/history/{}", id))),
            )
            .await?;
        let _: MessageResponse = parse_response(resp).await?;
        Ok(())
    }
}

/// Extracts `filename` from a `Content-Disposition: attachment; filename="..."` value.
fn attachment_filename(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

async fn check_status(resp: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    Err(ClientError::Api { status, message })
}

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> ClientResult<T> {
    let resp = check_status(resp).await?;
    Ok(resp.json().await?)
}
