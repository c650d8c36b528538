// Configuration for the server and the upstream Lightning client

use std::time::Duration;

use lightning_core::LightningSettings;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub app_env: String,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            app_env: "development".to_string(),
            rate_limit_per_minute: 60,
            request_timeout_secs: 60,
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let rate_limit_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| origins.split(',').map(|s| s.trim().to_string()).collect());

        Self {
            port,
            app_env,
            rate_limit_per_minute,
            request_timeout_secs,
            cors_allowed_origins,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Build upstream connection settings from the environment. The API key
/// may legitimately be absent here; the client rejects it per-request so
/// the server can still boot for preview-only use.
pub fn lightning_settings_from_env() -> LightningSettings {
    let defaults = LightningSettings::default();
    LightningSettings {
        api_key: std::env::var("SMALLEST_API_KEY").unwrap_or_default(),
        api_url: std::env::var("LIGHTNING_API_URL").unwrap_or(defaults.api_url),
        model: std::env::var("LIGHTNING_MODEL").unwrap_or(defaults.model),
        sample_rate: std::env::var("LIGHTNING_SAMPLE_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.sample_rate),
        output_format: std::env::var("LIGHTNING_OUTPUT_FORMAT").unwrap_or(defaults.output_format),
        timeout: std::env::var("LIGHTNING_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
    }
}
