//! services/api/src/web/routes.rs
//!
//! Assembles the public and protected routes, the shared layers and the
//! Swagger UI into the application router.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::web::{
    auth::{login_handler, logout_handler, me_handler, signup_handler},
    middleware::require_auth,
    rest::{
        delete_record_handler, download_handler, generate_handler, get_record_handler,
        health_handler, list_history_handler, list_providers_handler, ApiDoc,
    },
    state::AppState,
};

/// Multipart overhead allowed on top of the configured upload size.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: Arc<AppState>) -> Result<Router, ConfigError> {
    let origin = state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/signup", post(signup_handler))
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/health", get(health_handler))
        .route("/api/providers", get(list_providers_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/me", get(me_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/generate/{id}", get(get_record_handler))
        .route("/api/download/{format}/{id}", get(download_handler))
        .route("/api/history", get(list_history_handler))
        .route("/api/history/{id}", delete(delete_record_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use testcase_core::memory::{InMemoryRecordStore, InMemoryTokenStore, InMemoryUserStore};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        let state = AppState::build(
            Arc::new(config),
            Arc::new(InMemoryUserStore::default()),
            Arc::new(InMemoryTokenStore::default()),
            Arc::new(InMemoryRecordStore::default()),
        );
        build_router(Arc::new(state)).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn signup(app: &Router, email: &str) -> String {
        let response = send(
            app,
            json_request(
                "POST",
                "/api/signup",
                None,
                json!({"name": "Tester", "email": email, "password": "secret1"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn generate(app: &Router, token: &str, requirements: &str) -> Value {
        let response = send(
            app,
            json_request(
                "POST",
                "/api/generate",
                Some(token),
                json!({"requirements": requirements, "project_type": "Web"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    #[tokio::test]
    async fn signup_login_me_and_logout() {
        let app = test_app();
        let token = signup(&app, " Tester@Example.com ").await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/login",
                None,
                json!({"email": "tester@example.com", "password": "secret1"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let login = body_json(response).await;
        assert_eq!(login["message"], "Login successful");
        assert_eq!(login["user"]["email"], "tester@example.com");
        assert!(login["user"].get("password_hash").is_none());
        let second_token = login["token"].as_str().unwrap().to_string();
        assert_ne!(second_token, token);

        let response = send(&app, authed("GET", "/api/me", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["user"]["name"], "Tester");

        let response = send(&app, authed("POST", "/api/logout", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, authed("GET", "/api/me", &token)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": "Unauthorized"}));

        // Other sessions of the same user are unaffected.
        let response = send(&app, authed("GET", "/api/me", &second_token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        // Logging out twice, or without a token, still succeeds.
        let response = send(&app, authed("POST", "/api/logout", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signup_rejects_duplicates_and_bad_input() {
        let app = test_app();
        signup(&app, "dup@example.com").await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/signup",
                None,
                json!({"name": "Again", "email": "DUP@example.com", "password": "secret1"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/signup",
                None,
                json!({"name": "Short", "email": "short@example.com", "password": "123"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/login",
                None,
                json!({"email": "dup@example.com", "password": "wrong-password"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Invalid email or password"})
        );
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_and_bogus_tokens() {
        let app = test_app();
        for request in [
            Request::builder()
                .uri("/api/history")
                .body(Body::empty())
                .unwrap(),
            authed("GET", "/api/history", "not-a-token"),
            authed("GET", "/api/history", &"ab".repeat(32)),
        ] {
            let response = send(&app, request).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(body_json(response).await, json!({"error": "Unauthorized"}));
        }
    }

    #[tokio::test]
    async fn health_check_needs_no_token() {
        let app = test_app();
        let response = send(
            &app,
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["message"], "Test Case Generator API is running");
    }

    #[tokio::test]
    async fn providers_list_mock_as_default_without_keys() {
        let app = test_app();
        let response = send(
            &app,
            Request::builder()
                .uri("/api/providers")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["default"], "mock");
        assert_eq!(body["providers"][0]["id"], "mock");
        assert_eq!(body["providers"][0]["name"], "Demo Mode");
    }

    #[tokio::test]
    async fn login_requirement_generates_and_exports() {
        let app = test_app();
        let token = signup(&app, "qa@example.com").await;

        let record = generate(&app, &token, "Login must support email and password").await;
        let id = record["id"].as_str().unwrap().to_string();
        let total = record["test_cases"].as_array().unwrap().len() as u64;
        assert!(total >= 1);
        assert_eq!(record["provider"], "mock");
        assert_eq!(record["project_type"], "Web");
        assert!(record["filename"]
            .as_str()
            .unwrap()
            .starts_with("test_cases_web_"));
        assert_eq!(record["summary"]["total"], total);
        let by_priority = record["summary"]["high"].as_u64().unwrap()
            + record["summary"]["medium"].as_u64().unwrap()
            + record["summary"]["low"].as_u64().unwrap();
        assert_eq!(by_priority, total);

        let response = send(&app, authed("GET", &format!("/api/generate/{}", id), &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["test_cases"], record["test_cases"]);

        for (segment, extension, content_type) in [
            (
                "excel",
                "xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            ("csv", "csv", "text/csv"),
        ] {
            let response = send(
                &app,
                authed("GET", &format!("/api/download/{}/{}", segment, id), &token),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CONTENT_TYPE], content_type);
            assert_eq!(
                response.headers()[header::CONTENT_DISPOSITION],
                format!("attachment; filename=\"test_cases_{}.{}\"", id, extension).as_str()
            );
            assert!(!body_bytes(response).await.is_empty());
        }
    }

    #[tokio::test]
    async fn generation_input_errors() {
        let app = test_app();
        let token = signup(&app, "input@example.com").await;

        let response = send(
            &app,
            json_request("POST", "/api/generate", Some(&token), json!({"requirements": "  "})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/generate",
                Some(&token),
                json!({"requirements": "Checkout flow", "ai_provider": "nonexistent"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, authed("GET", "/api/history", &token)).await;
        assert_eq!(body_json(response).await, json!({"history": []}));
    }

    #[tokio::test]
    async fn multipart_upload_uses_the_document_text() {
        let app = test_app();
        let token = signup(&app, "upload@example.com").await;

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"project_type\"\r\n\r\nmobile\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"reqs.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nCheckout must accept cards\r\n--{b}--\r\n",
            b = boundary
        );
        let response = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/api/generate")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let record = body_json(response).await;
        assert_eq!(record["filename"], "reqs.txt");
        assert_eq!(record["project_type"], "Mobile");
        assert_eq!(record["requirements"], "Checkout must accept cards");
        assert!(record["test_cases"][0]["module"]
            .as_str()
            .unwrap()
            .starts_with("Checkout"));
    }

    #[tokio::test]
    async fn records_are_private_and_deletable_once() {
        let app = test_app();
        let alice = signup(&app, "alice@example.com").await;
        let bob = signup(&app, "bob@example.com").await;

        let first = generate(&app, &alice, "Search returns results").await;
        let second = generate(&app, &alice, "Profile can be edited").await;
        let id = first["id"].as_str().unwrap();

        let response = send(&app, authed("GET", "/api/history", &alice)).await;
        let history = body_json(response).await;
        assert_eq!(history["history"][0]["id"], second["id"]);
        assert_eq!(history["history"][1]["id"], first["id"]);

        for request in [
            authed("GET", &format!("/api/generate/{}", id), &bob),
            authed("GET", &format!("/api/download/csv/{}", id), &bob),
            authed("DELETE", &format!("/api/history/{}", id), &bob),
            authed("GET", "/api/generate/not-a-uuid", &alice),
        ] {
            let response = send(&app, request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(body_json(response).await, json!({"error": "File not found"}));
        }

        let response = send(&app, authed("DELETE", &format!("/api/history/{}", id), &alice)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = send(&app, authed("DELETE", &format!("/api/history/{}", id), &alice)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(&app, authed("GET", &format!("/api/generate/{}", id), &alice)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        for segment in ["excel", "csv"] {
            let response = send(
                &app,
                authed("GET", &format!("/api/download/{}/{}", segment, id), &alice),
            )
            .await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(body_json(response).await, json!({"error": "File not found"}));
        }

        let response = send(&app, authed("GET", "/api/history", &alice)).await;
        let history = body_json(response).await;
        assert_eq!(history["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_export_format_is_rejected() {
        let app = test_app();
        let token = signup(&app, "format@example.com").await;
        let record = generate(&app, &token, "Reports can be printed").await;

        let response = send(
            &app,
            authed(
                "GET",
                &format!("/api/download/pdf/{}", record["id"].as_str().unwrap()),
                &token,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = test_app();
        let response = send(
            &app,
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"].get("/api/generate").is_some());
        assert!(doc["paths"].get("/api/health").is_some());
    }
}
