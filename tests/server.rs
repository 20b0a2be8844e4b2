mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use common::TestContext;
use github_star_charts::server::{create_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BODY_LIMIT: usize = 1024 * 1024;

fn app(ctx: &TestContext, tokens: &[&str]) -> axum::Router {
    let github = ctx.github(tokens);
    let pipeline = Arc::new(ctx.pipeline(github.clone()));
    create_router(AppState::new(
        pipeline,
        github,
        ctx.metrics.clone(),
        Duration::from_secs(5),
    ))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap().to_vec();
    (status, content_type, body)
}

#[tokio::test]
async fn test_chart_endpoint_serves_svg() {
    let ctx = TestContext::new().await;
    ctx.mock_rate_limit(4000, 5000).await;
    ctx.mock_repo("test/test", 1).await;
    ctx.mock_stargazers_page("test/test", 1, &["2020-01-01"]).await;

    let (status, content_type, body) = get(app(&ctx, &["ghp_TokenA"]), "/test/test.svg?variant=dark").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/svg+xml;charset=utf-8"));
    assert!(String::from_utf8_lossy(&body).starts_with("<svg"));
}

#[tokio::test]
async fn test_upstream_failure_still_serves_svg() {
    let ctx = TestContext::new().await;
    ctx.mock_rate_limit(4000, 5000).await;
    ctx.mock_repo_status("test/test", 503).await;

    let (status, content_type, _) = get(app(&ctx, &["ghp_TokenA"]), "/test/test").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/svg+xml;charset=utf-8"));
}

#[tokio::test]
async fn test_invalid_variant_is_bad_request() {
    let ctx = TestContext::new().await;

    let (status, _, body) = get(app(&ctx, &["ghp_TokenA"]), "/test/test?variant=neon").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("neon"));
    assert_eq!(ctx.total_requests().await, 0);
}

#[tokio::test]
async fn test_unknown_repository_is_bad_request() {
    let ctx = TestContext::new().await;
    ctx.mock_rate_limit(4000, 5000).await;
    ctx.mock_repo_status("test/missing", 404).await;

    let (status, _, body) = get(app(&ctx, &["ghp_TokenA"]), "/test/missing").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("Repository not found"));
}

#[tokio::test]
async fn test_liveness() {
    let ctx = TestContext::new().await;

    let (status, _, body) = get(app(&ctx, &[]), "/livez").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "alive");
}

#[tokio::test]
async fn test_health_reports_credentials() {
    let ctx = TestContext::new().await;

    let (status, _, body) = get(app(&ctx, &["ghp_TokenA", "ghp_TokenB"]), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["credentials"]["status"], "healthy");
    assert_eq!(json["metrics"]["gauges"]["github_available_tokens"], 2.0);
}

#[tokio::test]
async fn test_health_without_tokens_is_degraded() {
    let ctx = TestContext::new().await;

    let (status, _, body) = get(app(&ctx, &[]), "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "degraded");
}

#[tokio::test]
async fn test_readiness() {
    let ctx = TestContext::new().await;

    let (status, _, body) = get(app(&ctx, &["ghp_TokenA"]), "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ready"], true);
}
