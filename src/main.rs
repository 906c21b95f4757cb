use anyhow::Context;
use profitscan::config::{Config, LookupMode};
use profitscan::{api, Orchestrator};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    if config.lookup_mode == LookupMode::Simulated {
        tracing::warn!(
            "Using simulated price lookups ({}% failure rate); set LOOKUP_MODE=serpapi for live prices",
            config.sim_failure_rate * 100.0
        );
    }

    let orchestrator = Orchestrator::new(config.price_cache());
    let app = api::create_router(api::AppState::new(config, orchestrator));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
