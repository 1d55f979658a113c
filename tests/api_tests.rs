use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, Utc};
use horcrux::api;
use horcrux::backend::{BackendRegistry, GoogleDriveBackend};
use horcrux::config::{Config, ConfigStore};
use horcrux::oauth::OAuthToken;
use horcrux::AppState;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_state(dir: &tempfile::TempDir, server: &MockServer) -> Arc<AppState> {
    let secret = serde_json::json!({
        "installed": {
            "client_id": "test-client",
            "client_secret": "test-secret",
            "auth_uri": format!("{}/auth", server.uri()),
            "token_uri": format!("{}/token", server.uri()),
            "redirect_uris": ["http://localhost:9999/redirect"],
        }
    });
    let secret_path = dir.path().join("secret.json");
    std::fs::write(&secret_path, secret.to_string()).unwrap();

    let assets_dir = dir.path().join("assets");
    std::fs::create_dir_all(&assets_dir).unwrap();

    let config = Config {
        bind_address: "127.0.0.1:0".to_string(),
        client_config_path: dir.path().join("client_config.json"),
        credentials_dir: dir.path().join("creds"),
        gdrive_client_secret_path: secret_path,
        gdrive_api_base: Some(server.uri()),
        assets_dir,
        log_file: dir.path().join("test.log"),
        max_upload_size: 10 * 1024 * 1024,
    };

    let client_config = ConfigStore::load(&config.client_config_path);

    Arc::new(AppState {
        config,
        client_config: tokio::sync::Mutex::new(client_config),
        registry: BackendRegistry::new(),
    })
}

/// Register a gdrive backend whose token cache holds a token expiring at
/// the given offset from now.
async fn register_gdrive_with_token(state: &AppState, expiry_offset: Duration) {
    let backend = GoogleDriveBackend::from_config(&state.config).unwrap();
    let tok = OAuthToken {
        access_token: "cached-token".to_string(),
        token_type: "Bearer".to_string(),
        refresh_token: String::new(),
        expiry: Utc::now() + expiry_offset,
    };
    tok.save(backend.cache_file()).unwrap();
    state.registry.register(Arc::new(backend)).await;
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn multipart_two_files() -> (String, Body) {
    let boundary = "test-upload-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"first.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         first contents\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"second.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         second contents\r\n\
         --{boundary}--\r\n"
    );
    (
        format!("multipart/form-data; boundary={boundary}"),
        Body::from(body),
    )
}

// ============================================================================
// Gating: link page vs home page
// ============================================================================

#[tokio::test]
async fn index_renders_link_page_when_nothing_is_linked() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);
    let app = api::create_router(state);

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Link your accounts"));
}

#[tokio::test]
async fn index_renders_link_page_when_token_is_expired() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);
    register_gdrive_with_token(&state, Duration::hours(-1)).await;

    let app = api::create_router(state);
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Link your accounts"));
}

#[tokio::test]
async fn index_renders_home_page_when_token_is_valid() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);
    register_gdrive_with_token(&state, Duration::hours(1)).await;

    let app = api::create_router(state);
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Upload files below"));
}

// ============================================================================
// Verb policy
// ============================================================================

#[tokio::test]
async fn wrong_verbs_get_400() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);
    let app = api::create_router(state);

    for (verb, uri) in [
        ("POST", "/"),
        ("GET", "/link"),
        ("POST", "/redirect"),
        ("GET", "/upload/file"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(verb)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "{verb} {uri} should be rejected"
        );
    }
}

// ============================================================================
// The end-to-end link scenario
// ============================================================================

#[tokio::test]
async fn link_scenario_registers_backend_and_reaches_home_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "token_type": "Bearer",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);
    let app = api::create_router(Arc::clone(&state));

    // Empty config: the index gates to the link page.
    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(body_text(response).await.contains("Link your accounts"));

    // Linking gdrive registers the backend, persists the flag, and issues
    // the consent redirect.
    let response = app
        .clone()
        .oneshot(
            Request::post("/link")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("gdrive=on"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with(&format!("{}/auth?", server.uri())));
    assert!(location.contains("state=state-token"));

    assert!(state.registry.contains("gdrive").await);
    assert!(state.client_config.lock().await.get().using_gdrive);
    let reloaded = ConfigStore::load(dir.path().join("client_config.json"));
    assert!(reloaded.get().using_gdrive);

    // The provider calls back with the code; the exchange persists a token
    // and the handler renders the home page.
    let response = app
        .clone()
        .oneshot(
            Request::get("/redirect?state=state-token&code=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Upload files below"));

    let token_file = dir.path().join("creds").join("gdrive_token.json");
    assert!(OAuthToken::from_file(&token_file).unwrap().is_valid());

    // Linked: the index now gates to the home page.
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(body_text(response).await.contains("Upload files below"));
}

#[tokio::test]
async fn redirect_without_code_is_a_request_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);
    register_gdrive_with_token(&state, Duration::hours(-1)).await;

    let app = api::create_router(Arc::clone(&state));
    let response = app
        .oneshot(
            Request::get("/redirect?state=state-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("code"));
}

#[tokio::test]
async fn redirect_without_registered_backend_fails() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);

    let app = api::create_router(state);
    let response = app
        .oneshot(
            Request::get("/redirect?code=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Uploads
// ============================================================================

#[tokio::test]
async fn upload_streams_every_part_to_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "1" })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);
    register_gdrive_with_token(&state, Duration::hours(1)).await;

    let (content_type, body) = multipart_two_files();
    let app = api::create_router(state);
    let response = app
        .oneshot(
            Request::post("/upload/file")
                .header(header::CONTENT_TYPE, content_type)
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn first_upload_failure_aborts_remaining_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);
    register_gdrive_with_token(&state, Duration::hours(1)).await;

    let (content_type, body) = multipart_two_files();
    let app = api::create_router(state);
    let response = app
        .oneshot(
            Request::post("/upload/file")
                .header(header::CONTENT_TYPE, content_type)
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("backend exploded"));

    // Only the first file ever reached the provider.
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn upload_without_linked_backend_fails() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);

    let (content_type, body) = multipart_two_files();
    let app = api::create_router(state);
    let response = app
        .oneshot(
            Request::post("/upload/file")
                .header(header::CONTENT_TYPE, content_type)
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn other_upload_subpaths_are_ignored() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);

    let app = api::create_router(state);
    let response = app
        .oneshot(
            Request::post("/upload/elsewhere")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, &server);

    let app = api::create_router(state);
    let response = app
        .oneshot(
            Request::get("/_internal/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("\"ok\""));
}
