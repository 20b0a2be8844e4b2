//! Serves SVG charts of a GitHub repository's star history.
//!
//! Requests go through [`pipeline::ChartPipeline`], which checks the cache,
//! fetches repository details and stargazers through the token-rotating
//! [`github::GitHub`] gateway on a miss, renders the chart and caches it.

pub mod cache;
pub mod chart;
pub mod cli;
pub mod error;
pub mod github;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod pool;
pub mod server;
pub mod types;
