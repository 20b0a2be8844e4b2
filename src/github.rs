use crate::cache::ChartCache;
use crate::error::{Result, StarChartsError};
use crate::metrics::{MetricsSink, EFFECTIVE_ETAGS, RATE_LIMIT_HITS, RATE_LIMIT_REMAINING};
use crate::pool::{Credential, CredentialPool};
use crate::types::{RateLimitResponse, Repository, StarEvent};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, ETAG, IF_NONE_MATCH};
use reqwest::{Client, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const API_BASE_URL: &str = "https://api.github.com";
const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const STAR_MEDIA_TYPE: &str = "application/vnd.github.v3.star+json";
const MAX_TRIES: usize = 3;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub tokens: Vec<String>,
    /// Stargazers requested per page, clamped to 1..=100
    pub page_size: u32,
    /// Share of a token's hourly budget that may be consumed before it is
    /// considered too hot to use
    pub max_rate_usage_pct: u32,
    /// GitHub refuses to paginate past this many pages
    pub max_pages: u32,
    pub etag_ttl: Duration,
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: API_BASE_URL.to_string(),
            tokens: Vec::new(),
            page_size: 100,
            max_rate_usage_pct: 80,
            max_pages: 400,
            etag_ttl: Duration::from_secs(7 * 24 * 3600),
            timeout: Duration::from_secs(30),
        }
    }
}

/// GitHub API gateway that rotates through a pool of tokens.
pub struct GitHub {
    client: Client,
    base_url: Url,
    pool: CredentialPool,
    page_size: u32,
    max_rate_usage_pct: u32,
    max_pages: u32,
    etag_ttl: Duration,
    cache: Arc<dyn ChartCache>,
    metrics: Arc<dyn MetricsSink>,
}

impl GitHub {
    pub fn new(
        config: GitHubConfig,
        cache: Arc<dyn ChartCache>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("github-star-charts/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        let mut base_url = Url::parse(&config.api_url).map_err(|e| {
            StarChartsError::InvalidRequest(format!("invalid GitHub API url '{}': {}", config.api_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StarChartsError::InvalidRequest(format!(
                "GitHub API url '{}' cannot be a base",
                config.api_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let pool = CredentialPool::new(config.tokens, metrics.clone());
        info!(tokens = pool.len(), api = %base_url, "GitHub client ready");

        Ok(GitHub {
            client,
            base_url,
            pool,
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
            max_rate_usage_pct: config.max_rate_usage_pct,
            max_pages: config.max_pages.max(1),
            etag_ttl: config.etag_ttl,
            cache,
            metrics,
        })
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Asks `/rate_limit` whether `credential` is usable right now.
    ///
    /// A 401 invalidates the credential for good. Any other failure, or a
    /// budget that is already mostly spent, leaves it valid for later.
    pub async fn check_token(&self, credential: &Credential) -> Result<()> {
        let header = match auth_header(credential) {
            Ok(header) => header,
            Err(e) => {
                self.pool.invalidate(credential);
                return Err(e);
            }
        };

        let response = self
            .client
            .get(self.endpoint(&["rate_limit"])?)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .header(AUTHORIZATION, header)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.pool.invalidate(credential);
                return Err(StarChartsError::InvalidCredential(format!(
                    "token {} was rejected by GitHub",
                    credential
                )));
            }
            status if !status.is_success() => {
                return Err(StarChartsError::UpstreamUnavailable(format!(
                    "rate limit check failed with status {}",
                    status
                )));
            }
            _ => {}
        }

        let rate = response.json::<RateLimitResponse>().await?.rate;
        debug!(token = %credential, remaining = rate.remaining, limit = rate.limit, "rate limit");
        self.metrics.gauge(
            RATE_LIMIT_REMAINING,
            Some(&credential.to_string()),
            rate.remaining as f64,
        );

        if rate.limit == 0 || rate.used_pct() > self.max_rate_usage_pct {
            return Err(StarChartsError::CredentialTooHot(format!(
                "token {} has {}/{} calls left",
                credential, rate.remaining, rate.limit
            )));
        }
        Ok(())
    }

    /// Sends `request` with the first token that passes [`GitHub::check_token`].
    ///
    /// At most three tokens are tried. With no tokens configured the request goes
    /// out unauthenticated. The request itself is sent once; transport errors are
    /// returned as they are.
    async fn authorized_do(&self, mut request: Request) -> Result<Response> {
        let mut last_failure: Option<StarChartsError> = None;

        for attempt in 1..=MAX_TRIES {
            let credential = match self.pool.pick()? {
                Some(credential) => credential,
                None => {
                    debug!(url = %request.url(), "no tokens configured, sending unauthenticated request");
                    return Ok(self.client.execute(request).await?);
                }
            };

            match self.check_token(credential).await {
                Ok(()) => {
                    request
                        .headers_mut()
                        .insert(AUTHORIZATION, auth_header(credential)?);
                    return Ok(self.client.execute(request).await?);
                }
                Err(e) => {
                    warn!(attempt, token = %credential, error = %e, "token unusable, trying the next one");
                    last_failure = Some(e);
                }
            }
        }

        Err(StarChartsError::CredentialExhausted(format!(
            "no usable token after {} attempts: {}",
            MAX_TRIES,
            last_failure.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Fetches repository details, revalidating a stored copy with its ETag.
    pub async fn repo_details(&self, full_name: &str) -> Result<Repository> {
        let (owner, name) = split_full_name(full_name)?;
        let url = self.endpoint(&["repos", owner, name])?;
        let key = format!("repo:{}", full_name.to_ascii_lowercase());

        let repo: Repository = self
            .conditional_get(url, JSON_MEDIA_TYPE, &key, full_name)
            .await?;
        debug!(repo = %repo.full_name, stars = repo.stargazers_count, "repository details");
        Ok(repo)
    }

    /// Every star of `repo`, in the order GitHub lists them (oldest first).
    ///
    /// Pages are fetched one after another until a page comes back short or
    /// empty. A failing page fails the whole listing.
    pub async fn stargazers(&self, repo: &Repository) -> Result<Vec<StarEvent>> {
        let (owner, name) = split_full_name(&repo.full_name)?;

        let max_stars = self.page_size as u64 * self.max_pages as u64;
        if repo.stargazers_count as u64 > max_stars {
            return Err(StarChartsError::TooManyStars(format!(
                "{} has {} stars, GitHub only lists the first {}",
                repo.full_name, repo.stargazers_count, max_stars
            )));
        }

        let mut stars = Vec::with_capacity(repo.stargazers_count as usize);
        let mut page = 1;
        loop {
            let batch = self.stargazers_page(owner, name, page).await?;
            let fetched = batch.len();
            stars.extend(batch);

            debug!(repo = %repo.full_name, page, fetched, "fetched stargazers page");

            if fetched < self.page_size as usize || page >= self.max_pages {
                break;
            }
            page += 1;
        }

        info!(repo = %repo.full_name, stars = stars.len(), pages = page, "collected stargazers");
        Ok(stars)
    }

    async fn stargazers_page(&self, owner: &str, name: &str, page: u32) -> Result<Vec<StarEvent>> {
        let mut url = self.endpoint(&["repos", owner, name, "stargazers"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &self.page_size.to_string())
            .append_pair("page", &page.to_string());

        let key = stargazers_key(owner, name, self.page_size, page);
        self.conditional_get(url, STAR_MEDIA_TYPE, &key, &format!("{}/{}", owner, name))
            .await
    }

    /// GET with `If-None-Match` when a validated copy is stored under `key`.
    ///
    /// Only the decoded `T` is kept, next to the ETag that validates it, so a
    /// 304 always has a body to reuse and stargazer pages are stored without
    /// GitHub's user objects.
    async fn conditional_get<T>(
        &self,
        url: Url,
        accept: &'static str,
        key: &str,
        resource: &str,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let stored: Option<Validated<T>> = self
            .cache_get(key)
            .await
            .and_then(|bytes| serde_json::from_slice(&bytes).ok());

        let mut request = self.client.get(url).header(ACCEPT, accept).build()?;
        if let Some(stored) = &stored {
            if let Ok(value) = HeaderValue::from_str(&stored.etag) {
                request.headers_mut().insert(IF_NONE_MATCH, value);
            }
        }

        let response = self.authorized_do(request).await?;

        match response.status() {
            StatusCode::NOT_MODIFIED => match stored {
                Some(stored) => {
                    debug!(resource, "not modified, reusing stored body");
                    self.metrics.increment(EFFECTIVE_ETAGS);
                    Ok(stored.body)
                }
                None => Err(StarChartsError::UpstreamUnavailable(format!(
                    "{}: not modified, but nothing stored to reuse",
                    resource
                ))),
            },
            StatusCode::NOT_FOUND => Err(StarChartsError::RepositoryNotFound(resource.to_string())),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                self.metrics.increment(RATE_LIMIT_HITS);
                Err(StarChartsError::RateLimited(format!(
                    "{}: GitHub answered {}, please try again later",
                    resource,
                    response.status()
                )))
            }
            status if !status.is_success() => Err(StarChartsError::UpstreamUnavailable(format!(
                "{}: request failed with status {}",
                resource, status
            ))),
            _ => {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|h| h.to_str().ok())
                    .map(str::to_string);
                let body: T = serde_json::from_slice(&response.bytes().await?)?;

                if let Some(etag) = etag {
                    match serde_json::to_vec(&Validated { etag, body: &body }) {
                        Ok(bytes) => self.cache_put(key, bytes).await,
                        Err(e) => warn!(key, error = %e, "failed to encode response for the cache"),
                    }
                }
                Ok(body)
            }
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StarChartsError::InvalidRequest("GitHub API url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn cache_get(&self, key: &str) -> Option<Vec<u8>> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "failed to read from cache");
                None
            }
        }
    }

    async fn cache_put(&self, key: &str, value: Vec<u8>) {
        if let Err(e) = self.cache.put(key, value, self.etag_ttl).await {
            warn!(key, error = %e, "failed to write to cache");
        }
    }
}

/// A decoded response plus the ETag GitHub sent with it, cached as one entry.
#[derive(Serialize, Deserialize)]
struct Validated<T> {
    etag: String,
    body: T,
}

/// Cache key of one stargazer page. Names are lowercased since GitHub treats
/// them case-insensitively.
pub fn stargazers_key(owner: &str, name: &str, page_size: u32, page: u32) -> String {
    format!(
        "stargazers:{}/{}:{}:{}",
        owner.to_ascii_lowercase(),
        name.to_ascii_lowercase(),
        page_size,
        page
    )
}

fn auth_header(credential: &Credential) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("token {}", credential.expose_secret()))
        .map_err(|_| {
            StarChartsError::InvalidCredential(format!(
                "token {} contains characters not allowed in a header",
                credential
            ))
        })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Splits `owner/name`, rejecting anything else.
pub fn split_full_name(full_name: &str) -> Result<(&str, &str)> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(StarChartsError::InvalidRepository(format!(
            "expected owner/name, got '{}'",
            full_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_full_names() {
        assert_eq!(split_full_name("rust-lang/rust").unwrap(), ("rust-lang", "rust"));
        assert!(split_full_name("invalid-format").is_err());
        assert!(split_full_name("a/b/c").is_err());
        assert!(split_full_name("/b").is_err());
        assert!(split_full_name("a/").is_err());
    }
}
