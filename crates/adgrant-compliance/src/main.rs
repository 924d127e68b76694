mod banned;
mod config;
mod engine;
mod error;
mod filter;
mod policy;
mod risk;
mod server;
mod store;
mod text;
mod tracker;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use engine::ComplianceEngine;
use funnel_common::redis::RedisStore;
use policy::CompliancePolicy;
use server::ComplianceServer;
use store::IssueStore;

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

    info!("starting adgrant-compliance MCP server");

    let config = Config::from_env()?;
    info!(
        policy = ?config.policy_path,
        session_ttl_secs = config.session_ttl_secs,
        redis = config.redis_url.is_some(),
        "configuration loaded"
    );

    let policy = CompliancePolicy::load(config.policy_path.as_deref())?;
    let engine = ComplianceEngine::new(&policy)?;
    info!(
        banned_terms = policy.banned_terms.len(),
        safe_contexts = policy.safe_contexts.len(),
        risk_patterns = policy.risk_patterns.len(),
        risk_threshold = engine.risk_threshold(),
        strict_terms = policy.strict_terms.len(),
        "policy compiled"
    );

    let redis = RedisStore::new(config.redis_url.as_deref());
    if redis.is_available().await {
        info!("redis connected, issue logs are persisted");
    } else {
        info!("redis unavailable, issue logs kept in memory");
    }
    let store = IssueStore::new(redis, config.session_ttl_secs);

    let server = ComplianceServer::new(Arc::new(engine), Arc::new(store));

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
