//! Common utilities for integration tests

use std::time::Duration;

use axum::Router;
use lightning_core::{LightningClient, LightningSettings};
use server::config::ServerConfig;
use server::routes::{build_router, AppState};

/// Create a test app with no upstream credential, so streaming requests
/// fail fast at the credential check instead of touching the network.
pub fn create_test_app() -> Router {
    create_test_app_with_key("")
}

/// Create a test app with a credential but an unroutable upstream, for
/// exercising the transport-failure path without real network traffic.
pub fn create_test_app_with_key(api_key: &str) -> Router {
    let settings = LightningSettings {
        api_key: api_key.to_string(),
        api_url: "http://127.0.0.1:9/lightning".to_string(),
        timeout: Duration::from_millis(500),
        ..Default::default()
    };
    let client = LightningClient::new(settings).expect("test client must build");
    let state = AppState::new(client, ServerConfig::default());
    build_router(state)
}
