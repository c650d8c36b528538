//! Streaming client for the upstream Lightning TTS provider.
//!
//! Issues one streaming synthesis POST per request, detects the wire
//! framing (raw chunked PCM vs. server-sent events carrying base64
//! audio), and yields a lazy sequence of byte chunks while recording
//! time-to-first-byte. There is no retry at this layer: any upstream
//! error terminates the stream and surfaces as a typed failure.

pub mod sse;

use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::json;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_VOICE_ID: &str = "sophia";

/// Upstream connection parameters, passed explicitly into the client
/// constructor. No process-wide mutable singleton.
#[derive(Debug, Clone)]
pub struct LightningSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub sample_rate: u32,
    pub output_format: String,
    pub timeout: Duration,
}

impl Default for LightningSettings {
    fn default() -> Self {
        Self {
            api_url: "https://waves-api.smallest.ai/api/v1/lightning-v3.1/stream".to_string(),
            api_key: String::new(),
            model: "lightning-v3.1".to_string(),
            sample_rate: 24_000,
            output_format: "pcm".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Typed error for upstream Lightning API failures.
#[derive(Debug, Error)]
pub enum LightningError {
    #[error("Lightning API key is empty after trimming whitespace")]
    MissingApiKey,

    #[error("Lightning API error ({status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error("Lightning API request timed out")]
    Timeout,

    #[error("Lightning API request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected streaming failure: {0}")]
    Unexpected(String),
}

impl LightningError {
    /// Upstream HTTP status, when the failure carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LightningError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LightningError::Timeout
        } else {
            LightningError::Transport(err)
        }
    }
}

/// Timing metadata captured during the upstream stream lifecycle.
///
/// The first-byte slot is written exactly once, right before the first
/// non-empty chunk is yielded, and is read-only afterward.
#[derive(Debug, Clone)]
pub struct StreamMetrics {
    request_start: Instant,
    first_byte: Arc<OnceLock<Instant>>,
}

impl StreamMetrics {
    /// Start the clock for a new upstream request.
    pub fn new() -> Self {
        Self {
            request_start: Instant::now(),
            first_byte: Arc::new(OnceLock::new()),
        }
    }

    /// Latch the first-byte time. No-op after the first call.
    pub fn mark_first_byte(&self) {
        let _ = self.first_byte.set(Instant::now());
    }

    pub fn first_byte_at(&self) -> Option<Instant> {
        self.first_byte.get().copied()
    }

    pub fn ttfb_ms(&self) -> Option<f64> {
        self.first_byte
            .get()
            .map(|at| at.duration_since(self.request_start).as_secs_f64() * 1000.0)
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, finite, non-restartable sequence of audio byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LightningError>> + Send>>;

/// Minimal client for the Lightning streaming TTS API.
pub struct LightningClient {
    settings: LightningSettings,
    http: reqwest::Client,
}

impl LightningClient {
    pub fn new(settings: LightningSettings) -> Result<Self, LightningError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(LightningError::from_reqwest)?;
        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &LightningSettings {
        &self.settings
    }

    /// Create a streaming synthesis request and return the chunk sequence
    /// plus its metrics handle.
    ///
    /// The sequence is consumed by at most one reader. Dropping it drops
    /// the underlying response, which closes the upstream connection.
    pub async fn stream_speech(
        &self,
        script_text: &str,
        voice_id: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Result<(ByteStream, StreamMetrics), LightningError> {
        let metrics = StreamMetrics::new();

        let api_key = self.settings.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(LightningError::MissingApiKey);
        }

        let voice = voice_id.unwrap_or(DEFAULT_VOICE_ID);
        let mut payload = json!({
            "text": script_text,
            "model": self.settings.model,
            "sample_rate": self.settings.sample_rate,
            "output_format": self.settings.output_format,
            "voice_id": voice,
        });
        if let Some(metadata) = metadata {
            payload["metadata"] = metadata;
        }

        info!(
            url = %self.settings.api_url,
            key_len = api_key.len(),
            voice_id = voice,
            "Lightning request prepared"
        );

        let response = self
            .http
            .post(&self.settings.api_url)
            .bearer_auth(&api_key)
            .json(&payload)
            .send()
            .await
            .map_err(LightningError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let detail = response.text().await.unwrap_or_default();
            return Err(LightningError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let stream = if content_type.contains("text/event-stream") {
            Self::sse_stream(response, metrics.clone())
        } else {
            Self::raw_stream(response, metrics.clone())
        };

        Ok((stream, metrics))
    }

    /// Raw chunked framing: forward transport chunks, skipping empties.
    fn raw_stream(response: reqwest::Response, metrics: StreamMetrics) -> ByteStream {
        Box::pin(try_stream! {
            let mut upstream = response.bytes_stream();
            while let Some(chunk) = upstream.next().await {
                let chunk = chunk.map_err(LightningError::from_reqwest)?;
                if chunk.is_empty() {
                    continue;
                }
                metrics.mark_first_byte();
                yield chunk;
            }
        })
    }

    /// Event-stream framing: decode `audio` frames to raw PCM bytes.
    fn sse_stream(response: reqwest::Response, metrics: StreamMetrics) -> ByteStream {
        Box::pin(try_stream! {
            let mut parser = sse::SseParser::new();
            let mut upstream = response.bytes_stream();
            while let Some(chunk) = upstream.next().await {
                let chunk = chunk.map_err(LightningError::from_reqwest)?;
                for payload in parser.feed(&chunk) {
                    metrics.mark_first_byte();
                    yield Bytes::from(payload);
                }
            }
            if let Some(payload) = parser.finish() {
                metrics.mark_first_byte();
                yield Bytes::from(payload);
            }
        })
    }
}
