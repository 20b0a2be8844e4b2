use anyhow::Context;
use clap::Parser;
use colored::*;
use github_star_charts::cache::{ChartCache, MemoryCache};
use github_star_charts::chart::ChartRenderer;
use github_star_charts::cli::Cli;
use github_star_charts::github::GitHub;
use github_star_charts::metrics::InMemoryMetrics;
use github_star_charts::pipeline::ChartPipeline;
use github_star_charts::server::{self, AppState};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cli.log_level))
        )
        .init();

    println!("{}", "GitHub Star Charts Server".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    let metrics = Arc::new(InMemoryMetrics::new());
    let cache_config = cli.cache_config();
    let cache: Arc<dyn ChartCache> = Arc::new(MemoryCache::new(&cache_config));

    let github = Arc::new(
        GitHub::new(cli.github_config(), cache.clone(), metrics.clone())
            .context("Failed to create GitHub client")?
    );

    if github.pool().is_empty() {
        println!("{}", "No GitHub tokens configured, requests will be unauthenticated".yellow());
    } else {
        println!("✅ Loaded {} GitHub tokens", github.pool().len());
    }

    let pipeline = Arc::new(ChartPipeline::new(
        github.clone(),
        cache,
        ChartRenderer::new(),
        cache_config.chart_ttl,
        metrics.clone(),
    ));

    let state = AppState::new(pipeline, github, metrics, cli.request_timeout());

    println!("📡 Serving charts on http://{}", cli.listen_addr);
    println!("\nPress Ctrl+C to stop the server\n");

    server::serve(&cli.listen_addr, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for shutdown signal: {}", e);
        }
        println!("\n🛑 Shutting down server...");
    })
    .await
    .with_context(|| format!("Failed to serve on {}", cli.listen_addr))?;

    println!("✅ Server stopped");

    Ok(())
}
