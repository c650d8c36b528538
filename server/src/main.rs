use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};
use tracing::{info, warn};

use lightning_core::LightningClient;
use server::config::{lightning_settings_from_env, ServerConfig};
use server::routes::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    info!("Starting voice lecture backend...");

    let config = ServerConfig::from_env();
    let settings = lightning_settings_from_env();
    if settings.api_key.trim().is_empty() {
        warn!("SMALLEST_API_KEY not set; streaming requests will be rejected");
    }
    let client =
        LightningClient::new(settings).map_err(|e| anyhow::anyhow!("client init failed: {e}"))?;

    let state = AppState::new(client, config.clone());
    info!(
        "Server configuration loaded: port={}, env={}, rate_limit={}/min, request_timeout={}s",
        config.port, config.app_env, config.rate_limit_per_minute, config.request_timeout_secs
    );

    // Rate limiting configuration
    // Using GlobalKeyExtractor to rate limit globally (all requests share the same limit)
    // This works better in Docker/proxy environments where IP extraction can be problematic
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second((config.rate_limit_per_minute / 60) as u64)
            .burst_size(config.rate_limit_per_minute)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .unwrap(),
    );
    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    let app = build_router(state).layer(GovernorLayer::new(governor_conf));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT."))?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
