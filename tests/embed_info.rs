//! End-to-end tests for `GET /embed-info`.
//!
//! A single wiremock server stands in for both the identity provider and the
//! reporting service; the router is driven in-process with `oneshot`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use embed_gateway::config::Config;
use embed_gateway::errors::{AppError, Stage};
use embed_gateway::{api, AppState};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";
const REPORT_PATH: &str = "/v1.0/myorg/groups/ws-1/reports/rep-1";
const GENERATE_PATH: &str = "/v1.0/myorg/groups/ws-1/reports/rep-1/GenerateToken";

fn config_for(server: &MockServer) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("EMBED_TENANT_ID", "tenant-1".to_string()),
        ("EMBED_CLIENT_ID", "client-1".to_string()),
        ("EMBED_CLIENT_SECRET", "secret-1".to_string()),
        ("EMBED_WORKSPACE_ID", "ws-1".to_string()),
        ("EMBED_REPORT_ID", "rep-1".to_string()),
        ("EMBED_DATASET_IDS", "ds-1".to_string()),
        ("EMBED_AUTHORITY_HOST", server.uri()),
        ("EMBED_API_BASE", format!("{}/v1.0/myorg", server.uri())),
        ("EMBED_HTTP_TIMEOUT_SECS", "5".to_string()),
    ]);
    Config::from_lookup(|k| vars.get(k).cloned()).unwrap()
}

fn state_for(server: &MockServer) -> Arc<AppState> {
    Arc::new(AppState::new(config_for(server)).unwrap())
}

fn app(server: &MockServer) -> Router {
    api::router(state_for(server))
}

async fn get_embed_info(app: Router) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/embed-info")
                .header("origin", "https://dashboard.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

fn assert_security_headers(headers: &axum::http::HeaderMap) {
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    let req_id = headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(req_id).is_ok());
}

async fn mount_token_ok(server: &MockServer, access_token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": access_token
        })))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_report_ok(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "R1",
            "name": "Quarterly",
            "embedUrl": "https://embed/x"
        })))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_generate_ok(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("authorization", "Bearer T1"))
        .and(body_json(json!({
            "accessLevel": "View",
            "datasets": [{"id": "ds-1"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "ET1",
            "tokenId": "tid-1",
            "expiration": "2025-01-01T00:00:00Z"
        })))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_never(server: &MockServer, verb: &str, p: &str) {
    Mock::given(method(verb))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

// ── Success ──────────────────────────────────────────────────

#[tokio::test]
async fn test_embed_info_composes_metadata_and_token() {
    let server = MockServer::start().await;
    mount_token_ok(&server, "T1", 1).await;
    mount_report_ok(&server, 1).await;
    mount_generate_ok(&server, 1).await;

    let (status, headers, body) = get_embed_info(app(&server)).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json,
        json!({
            "embedUrl": "https://embed/x",
            "reportId": "R1",
            "embedToken": "ET1",
            "expiration": "2025-01-01T00:00:00Z"
        })
    );

    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_security_headers(&headers);
}

#[tokio::test]
async fn test_each_call_reacquires_tokens() {
    let server = MockServer::start().await;
    mount_token_ok(&server, "T1", 2).await;
    mount_report_ok(&server, 2).await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "ET1",
            "expiration": "2025-01-01T00:00:00Z"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "ET2",
            "expiration": "2025-01-01T01:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let router = app(&server);
    let (s1, _, b1) = get_embed_info(router.clone()).await;
    let (s2, _, b2) = get_embed_info(router).await;

    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    let first: serde_json::Value = serde_json::from_slice(&b1).unwrap();
    let second: serde_json::Value = serde_json::from_slice(&b2).unwrap();
    assert_eq!(first["embedToken"], "ET1");
    assert_eq!(second["embedToken"], "ET2");
    assert_ne!(first["expiration"], second["expiration"]);
}

// ── Failure short-circuits ───────────────────────────────────

#[tokio::test]
async fn test_identity_failure_returns_500_without_downstream_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "invalid_client"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_never(&server, "GET", REPORT_PATH).await;
    mount_never(&server, "POST", GENERATE_PATH).await;

    let (status, headers, body) = get_embed_info(app(&server)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Failed to get embed info");
    assert!(headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    // Provider detail must not leak to the caller.
    assert!(!String::from_utf8_lossy(&body).contains("invalid_client"));
    assert_security_headers(&headers);
}

#[tokio::test]
async fn test_metadata_failure_skips_token_generation() {
    let server = MockServer::start().await;
    mount_token_ok(&server, "T1", 1).await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_never(&server, "POST", GENERATE_PATH).await;

    let (status, _, body) = get_embed_info(app(&server)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Failed to get embed info");
}

#[tokio::test]
async fn test_malformed_metadata_skips_token_generation() {
    let server = MockServer::start().await;
    mount_token_ok(&server, "T1", 1).await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;
    mount_never(&server, "POST", GENERATE_PATH).await;

    let (status, _, _) = get_embed_info(app(&server)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_token_generation_failure_returns_500() {
    let server = MockServer::start().await;
    mount_token_ok(&server, "T1", 1).await;
    mount_report_ok(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _, body) = get_embed_info(app(&server)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Failed to get embed info");
}

// ── Typed errors from the service ────────────────────────────

#[tokio::test]
async fn test_service_reports_failure_cause() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_scope"}"#))
        .mount(&server)
        .await;

    let state = state_for(&server);
    let err = state.embed.embed_info().await.unwrap_err();
    match err {
        AppError::Authentication { status, body } => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, r#"{"error":"invalid_scope"}"#);
        }
        other => panic!("expected Authentication, got {:?}", other),
    }
}

#[tokio::test]
async fn test_service_tags_generate_token_stage() {
    let server = MockServer::start().await;
    mount_token_ok(&server, "T1", 1).await;
    mount_report_ok(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let state = state_for(&server);
    let err = state.embed.embed_info().await.unwrap_err();
    assert_eq!(err.stage(), Stage::GenerateToken);
    assert_eq!(err.code(), "upstream_fetch_error");
}

// ── Plumbing ─────────────────────────────────────────────────

#[tokio::test]
async fn test_health_probes() {
    let server = MockServer::start().await;
    for uri in ["/healthz", "/readyz"] {
        let resp = app(&server)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let server = MockServer::start().await;
    let resp = app(&server)
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/embed-info")
                .header("origin", "https://anywhere.example")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
