#![allow(dead_code)]

use github_star_charts::cache::{ChartCache, MemoryCache};
use github_star_charts::chart::ChartRenderer;
use github_star_charts::github::{GitHub, GitHubConfig};
use github_star_charts::metrics::InMemoryMetrics;
use github_star_charts::pipeline::ChartPipeline;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CHART_TTL: Duration = Duration::from_secs(3600);

/// A mock GitHub API plus the shared cache and metrics the code under test uses.
pub struct TestContext {
    pub server: MockServer,
    pub cache: Arc<MemoryCache>,
    pub metrics: Arc<InMemoryMetrics>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            cache: Arc::new(MemoryCache::default()),
            metrics: Arc::new(InMemoryMetrics::new()),
        }
    }

    pub fn config(&self, tokens: &[&str]) -> GitHubConfig {
        GitHubConfig {
            api_url: self.server.uri(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            page_size: 2,
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    pub fn github(&self, tokens: &[&str]) -> Arc<GitHub> {
        self.github_with(self.config(tokens))
    }

    pub fn github_with(&self, config: GitHubConfig) -> Arc<GitHub> {
        let cache: Arc<dyn ChartCache> = self.cache.clone();
        Arc::new(GitHub::new(config, cache, self.metrics.clone()).expect("Failed to create client"))
    }

    pub fn pipeline(&self, github: Arc<GitHub>) -> ChartPipeline {
        ChartPipeline::new(
            github,
            self.cache.clone(),
            ChartRenderer::new(),
            CHART_TTL,
            self.metrics.clone(),
        )
    }

    pub async fn mock_rate_limit(&self, remaining: u32, limit: u32) {
        Mock::given(method("GET"))
            .and(path("/rate_limit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rate_limit_body(remaining, limit)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_repo(&self, full_name: &str, stars: u32) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{}", full_name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_body(full_name, stars)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_repo_status(&self, full_name: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{}", full_name)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Serves `page` of the stargazer listing with the given star dates
    /// (`YYYY-MM-DD`).
    pub async fn mock_stargazers_page(&self, full_name: &str, page: u32, dates: &[&str]) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{}/stargazers", full_name)))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(stargazers_body(dates)))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_stargazers_status(&self, full_name: &str, page: u32, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{}/stargazers", full_name)))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn request_count(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }

    pub async fn total_requests(&self) -> usize {
        self.server.received_requests().await.unwrap_or_default().len()
    }
}

pub fn rate_limit_body(remaining: u32, limit: u32) -> serde_json::Value {
    json!({ "rate": { "remaining": remaining, "limit": limit } })
}

pub fn repo_body(full_name: &str, stars: u32) -> serde_json::Value {
    json!({
        "full_name": full_name,
        "stargazers_count": stars,
        "created_at": "2008-02-28T20:40:04Z"
    })
}

pub fn stargazers_body(dates: &[&str]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = dates
        .iter()
        .map(|date| {
            json!({
                "starred_at": format!("{}T12:00:00Z", date),
                "user": { "login": "octocat" }
            })
        })
        .collect();
    serde_json::Value::Array(entries)
}
