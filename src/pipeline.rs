//! Cache-aside rendering of star history charts.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::ChartCache;
use crate::chart::style::ChartStyle;
use crate::chart::{ChartRenderer, Series};
use crate::error::{Result, StarChartsError};
use crate::github::GitHub;
use crate::metrics::{MetricsSink, CHARTS_CACHED, CHARTS_FALLBACK, CHARTS_RENDERED};
use crate::models::ChartRequest;

/// Where the bytes of a [`RenderedChart`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSource {
    Cached,
    Rendered,
    /// Upstream failed; the chart shows the error and was not cached
    Fallback,
}

#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub body: Vec<u8>,
    pub source: ChartSource,
}

pub struct ChartPipeline {
    github: Arc<GitHub>,
    cache: Arc<dyn ChartCache>,
    renderer: ChartRenderer,
    chart_ttl: Duration,
    metrics: Arc<dyn MetricsSink>,
}

impl ChartPipeline {
    pub fn new(
        github: Arc<GitHub>,
        cache: Arc<dyn ChartCache>,
        renderer: ChartRenderer,
        chart_ttl: Duration,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            github,
            cache,
            renderer,
            chart_ttl,
            metrics,
        }
    }

    /// Returns the chart for `request`, from the cache when possible.
    ///
    /// Only caller mistakes (unknown or malformed repository) come back as
    /// errors. Upstream failures produce a fallback chart that is never cached.
    #[instrument(skip(self, request), fields(repo = %request.full_name(), variant = %request.variant))]
    pub async fn render(&self, request: &ChartRequest) -> Result<RenderedChart> {
        let key = request.cache_key();

        match self.cache.get(&key).await {
            Ok(Some(body)) => {
                debug!("using cached chart");
                self.metrics.increment(CHARTS_CACHED);
                return Ok(RenderedChart {
                    body,
                    source: ChartSource::Cached,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read cached chart, rendering a fresh one"),
        }

        let started = Instant::now();
        let repo = match self.github.repo_details(&request.full_name()).await {
            Ok(repo) => repo,
            Err(e) if e.is_client_error() => {
                warn!(error = %e, "repository lookup rejected");
                return Err(e);
            }
            Err(e) => {
                error!(error = %e, "failed to get repository details");
                return Ok(self.fallback(&e));
            }
        };

        let stars = match self.github.stargazers(&repo).await {
            Ok(stars) => stars,
            Err(e) => {
                error!(error = %e, "failed to get stars");
                return Ok(self.fallback(&e));
            }
        };
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "collected stars");

        if stars.len() < 2 {
            info!(stars = stars.len(), "not enough results, padding the series");
        }
        let series = Series::from_stars(&stars, repo.created_at, Utc::now());

        let body = self
            .renderer
            .render(&series, &ChartStyle::from(request))
            .map_err(|e| {
                error!(error = %e, "chart rendering failed");
                e
            })?;
        self.metrics.increment(CHARTS_RENDERED);

        if let Err(e) = self.cache.put(&key, body.clone(), self.chart_ttl).await {
            error!(error = %e, "failed to cache chart");
        }

        Ok(RenderedChart {
            body,
            source: ChartSource::Rendered,
        })
    }

    /// Chart-sized error message for failures that should not reach the user
    /// as an error status.
    pub fn fallback_chart(&self, message: &str) -> RenderedChart {
        self.metrics.increment(CHARTS_FALLBACK);
        RenderedChart {
            body: self.renderer.render_error(message),
            source: ChartSource::Fallback,
        }
    }

    fn fallback(&self, error: &StarChartsError) -> RenderedChart {
        self.fallback_chart(&error.to_string())
    }
}
