use crate::error::StarChartsError;
use crate::github::GitHub;
use crate::metrics::{InMemoryMetrics, MetricsSnapshot};
use crate::models::{ChartRequest, HexColor, Variant};
use crate::pipeline::ChartPipeline;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const SVG_CONTENT_TYPE: &str = "image/svg+xml;charset=utf-8";
const SVG_CACHE_CONTROL: &str = "public, max-age=86400";

/// Health check status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub credentials: CheckResult,
}

/// Result of an individual check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness probe response (minimal, just indicates the process is running)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Readiness probe response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response for errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query parameters of the chart route
#[derive(Debug, Default, Deserialize)]
pub struct ChartParams {
    pub variant: Option<String>,
    pub background: Option<String>,
    pub axis: Option<String>,
    pub line: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChartPipeline>,
    pub github: Arc<GitHub>,
    pub metrics: Arc<InMemoryMetrics>,
    pub request_timeout: Duration,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        pipeline: Arc<ChartPipeline>,
        github: Arc<GitHub>,
        metrics: Arc<InMemoryMetrics>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            github,
            metrics,
            request_timeout,
            start_time: std::time::Instant::now(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/livez", get(liveness_check))
        .route("/readyz", get(readiness_check))
        .route("/:owner/:repo", get(repo_chart))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    addr: &str,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Chart server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// `GET /:owner/:repo`, where `repo` may end in `.svg`.
async fn repo_chart(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(params): Query<ChartParams>,
) -> Response {
    let request = match chart_request(&owner, &repo, &params) {
        Ok(request) => request,
        Err(e) => {
            warn!(owner = %owner, repo = %repo, error = %e, "invalid chart request");
            return client_error(e);
        }
    };

    // Dropping the render future on timeout also drops its in-flight GitHub calls.
    match tokio::time::timeout(state.request_timeout, state.pipeline.render(&request)).await {
        Ok(Ok(chart)) => svg_response(chart.body),
        Ok(Err(e)) if e.is_client_error() => client_error(e),
        Ok(Err(e)) => {
            error!(repo = %request.full_name(), error = %e, "failed to render chart");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "failed to render chart".to_string(),
                }),
            )
                .into_response()
        }
        Err(_) => {
            warn!(repo = %request.full_name(), "chart request timed out");
            let chart = state
                .pipeline
                .fallback_chart("timed out while talking to GitHub, please try again later");
            svg_response(chart.body)
        }
    }
}

fn chart_request(owner: &str, repo: &str, params: &ChartParams) -> Result<ChartRequest, StarChartsError> {
    let repo = repo.strip_suffix(".svg").unwrap_or(repo);
    let variant = match params.variant.as_deref() {
        Some(variant) => variant.parse::<Variant>()?,
        None => Variant::default(),
    };

    let mut request = ChartRequest::new(owner, repo, variant)?;
    if let Some(color) = non_empty(&params.background) {
        request = request.with_background(color.parse::<HexColor>()?);
    }
    if let Some(color) = non_empty(&params.axis) {
        request = request.with_axis(color.parse::<HexColor>()?);
    }
    if let Some(color) = non_empty(&params.line) {
        request = request.with_line(color.parse::<HexColor>()?);
    }
    Ok(request)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn svg_response(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, SVG_CONTENT_TYPE),
            (header::CACHE_CONTROL, SVG_CACHE_CONTROL),
        ],
        body,
    )
        .into_response()
}

fn client_error(e: StarChartsError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn credentials_check(github: &GitHub) -> CheckResult {
    let pool = github.pool();
    if pool.is_empty() {
        CheckResult {
            status: HealthStatus::Degraded,
            message: Some("No GitHub tokens configured, using unauthenticated requests".to_string()),
        }
    } else if pool.valid_count() == 0 {
        CheckResult {
            status: HealthStatus::Unhealthy,
            message: Some(format!("All {} GitHub tokens have been invalidated", pool.len())),
        }
    } else if pool.valid_count() < pool.len() {
        CheckResult {
            status: HealthStatus::Degraded,
            message: Some(format!(
                "{} of {} GitHub tokens still valid",
                pool.valid_count(),
                pool.len()
            )),
        }
    } else {
        CheckResult {
            status: HealthStatus::Healthy,
            message: None,
        }
    }
}

/// Main health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let credentials = credentials_check(&state.github);
    let status = credentials.status.clone();

    let response = HealthResponse {
        status: status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        checks: HealthChecks { credentials },
        metrics: state.metrics.snapshot(),
    };

    let status_code = match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Kubernetes liveness probe - just checks if the process is alive
async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(LivenessResponse {
            status: "alive".to_string(),
        }),
    )
}

/// Ready unless every configured token has been invalidated.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let check = credentials_check(&state.github);
    let ready = check.status != HealthStatus::Unhealthy;

    let response = ReadinessResponse {
        ready,
        message: if ready { None } else { check.message },
    };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(variant: Option<&str>, line: Option<&str>) -> ChartParams {
        ChartParams {
            variant: variant.map(str::to_string),
            line: line.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn strips_svg_suffix_and_parses_params() {
        let request = chart_request("caarlos0", "starcharts.svg", &params(Some("dark"), Some("f00"))).unwrap();
        assert_eq!(request.full_name(), "caarlos0/starcharts");
        assert_eq!(request.variant, Variant::Dark);
        assert_eq!(request.line.unwrap().as_str(), "#ff0000");
    }

    #[test]
    fn empty_params_fall_back_to_defaults() {
        let request = chart_request("o", "r", &params(None, Some(""))).unwrap();
        assert_eq!(request.variant, Variant::Adaptive);
        assert!(request.line.is_none());
    }

    #[test]
    fn invalid_params_are_client_errors() {
        let err = chart_request("o", "r", &params(Some("neon"), None)).unwrap_err();
        assert!(err.is_client_error());
        let err = chart_request("o", "r", &params(None, Some("zzz"))).unwrap_err();
        assert!(err.is_client_error());
    }
}
