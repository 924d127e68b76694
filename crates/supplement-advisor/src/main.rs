mod annotate;
mod cache;
mod catalog;
mod config;
mod error;
mod matcher;
mod model;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use annotate::TermGlossary;
use cache::RecommendationCache;
use catalog::Catalog;
use config::Config;
use funnel_common::redis::RedisStore;
use matcher::Matcher;
use server::SupplementAdvisorServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting supplement-advisor MCP server");

    let config = Config::from_env()?;
    info!(
        catalog = ?config.catalog_path,
        limit = config.recommendation_limit,
        jitter = config.jitter,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let redis = RedisStore::new(config.redis_url.as_deref());
    if redis.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }
    let cache = Arc::new(RecommendationCache::new(redis));

    let catalog = Arc::new(Catalog::load(config.catalog_path.as_deref())?);
    let glossary = TermGlossary::builtin()?;
    info!(
        version = catalog.version(),
        supplements = catalog.len(),
        symptoms = catalog.known_symptoms().len(),
        goals = catalog.known_goals().len(),
        glossary_terms = glossary.len(),
        "catalog loaded"
    );

    let matcher = Matcher::new(catalog, glossary)
        .with_limit(config.recommendation_limit)
        .with_scoring_mode(config.scoring_mode());
    let server = SupplementAdvisorServer::new(Arc::new(matcher), cache);

    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
