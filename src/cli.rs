use clap::Parser;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::github::{GitHubConfig, API_BASE_URL};

#[derive(Parser, Debug)]
#[command(name = "github-star-charts")]
#[command(about = "GitHub Star Charts Server - Renders the star history of GitHub repositories as SVG")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: String,

    /// GitHub tokens to rotate through, comma separated
    #[arg(long = "github-tokens", env = "GITHUB_TOKENS", value_delimiter = ',')]
    pub github_tokens: Vec<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = API_BASE_URL)]
    pub github_api_url: String,

    /// Stargazers fetched per page (GitHub allows at most 100)
    #[arg(long, env = "GITHUB_PAGE_SIZE", default_value_t = 100)]
    pub github_page_size: u32,

    /// Percentage of a token's rate limit that may be used before it is skipped
    #[arg(long, env = "GITHUB_MAX_RATE_USAGE_PCT", default_value_t = 80)]
    pub github_max_rate_usage_pct: u32,

    /// Deepest stargazer page GitHub will serve
    #[arg(long, env = "GITHUB_MAX_PAGES", default_value_t = 400)]
    pub github_max_pages: u32,

    /// Lifetime of a rendered chart in the cache, in seconds
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 86_400)]
    pub cache_ttl_secs: u64,

    /// Lifetime of stored ETags and the responses they validate, in seconds
    #[arg(long, env = "ETAG_TTL_SECS", default_value_t = 604_800)]
    pub etag_ttl_secs: u64,

    /// Maximum number of cache entries
    #[arg(long, env = "CACHE_MAX_ENTRIES", default_value_t = 10_000)]
    pub cache_max_entries: u64,

    /// Deadline for serving one chart, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.github_api_url.clone(),
            tokens: self.github_tokens.clone(),
            page_size: self.github_page_size,
            max_rate_usage_pct: self.github_max_rate_usage_pct,
            max_pages: self.github_max_pages,
            etag_ttl: Duration::from_secs(self.etag_ttl_secs),
            timeout: self.request_timeout(),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_capacity: self.cache_max_entries,
            chart_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
