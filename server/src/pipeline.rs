//! Request-scoped speech pipeline.
//!
//! Parses the LaTeX summary into a teaching script, opens the upstream
//! audio stream, and forwards byte chunks while firing semantic anchor
//! notifications against estimated playback progress. All four pipeline
//! entities live and die with a single request.

use std::sync::Arc;
use std::time::Instant;

use async_stream::try_stream;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use lightning_core::{ByteStream, LightningClient, LightningError, StreamMetrics};
use script_core::progress::{AnchorEvent, AnchorScheduler};
use script_core::{latex_to_teaching_script, SemanticAnchor};

/// Input payload for Lightning TTS generation.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeakRequest {
    pub latex_summary: String,
    pub session_id: Option<String>,
    pub voice_id: Option<String>,
    #[serde(default = "default_anchors_enabled")]
    pub anchors_enabled: bool,
    pub metadata: Option<serde_json::Value>,
}

fn default_anchors_enabled() -> bool {
    true
}

/// Debug-friendly JSON response from the non-stream endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SpeakResponse {
    pub message: String,
    pub teaching_script_preview: String,
    pub anchors: Vec<SemanticAnchor>,
}

/// Synchronous preview: parse the script and anchors without contacting
/// the upstream TTS provider. Used for debugging and compatibility.
pub fn speak_preview(req: &SpeakRequest) -> SpeakResponse {
    let script = latex_to_teaching_script(&req.latex_summary);
    SpeakResponse {
        message: "Lightning speech pipeline prepared".to_string(),
        teaching_script_preview: script.text,
        anchors: script.anchors,
    }
}

/// Completion-summary context carried alongside a live stream.
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub parse_ms: f64,
    pub sample_rate: u32,
    pub output_format: String,
    pub script_length: usize,
}

/// Parse, schedule, and open the upstream stream for one request.
///
/// Fails before yielding any bytes when the credential is missing or the
/// upstream rejects the request; later transport failures surface as
/// error items inside the returned stream.
pub async fn stream_speech(
    client: Arc<LightningClient>,
    req: SpeakRequest,
) -> Result<ByteStream, LightningError> {
    let parse_start = Instant::now();
    let script = latex_to_teaching_script(&req.latex_summary);
    let parse_ms = parse_start.elapsed().as_secs_f64() * 1000.0;

    let settings = client.settings();
    let anchor_count = if req.anchors_enabled { script.anchors.len() } else { 0 };
    let anchors = if req.anchors_enabled {
        script.anchors.clone()
    } else {
        Vec::new()
    };
    let scheduler = AnchorScheduler::new(&script.text, anchors, settings.sample_rate);
    let context = StreamContext {
        parse_ms,
        sample_rate: settings.sample_rate,
        output_format: settings.output_format.clone(),
        script_length: script.text.len(),
    };

    info!(
        session_id = ?req.session_id,
        script_length = context.script_length,
        anchor_count,
        "Teaching script prepared"
    );

    let (upstream, metrics) = client
        .stream_speech(&script.text, req.voice_id.as_deref(), req.metadata.clone())
        .await
        .map_err(|err| {
            error!(error = %err, "Lightning stream failed to start");
            err
        })?;

    Ok(Box::pin(forward_with_anchors(
        upstream, scheduler, metrics, context,
    )))
}

/// Forward upstream chunks unchanged while firing anchor notifications
/// inline, then flush-fire the remaining anchors and log the completion
/// summary once the upstream ends. Anchor evaluation is synchronous and
/// cheap, so it never blocks the byte-forwarding path.
pub fn forward_with_anchors<S>(
    mut upstream: S,
    mut scheduler: AnchorScheduler,
    metrics: StreamMetrics,
    context: StreamContext,
) -> impl Stream<Item = Result<Bytes, LightningError>> + Send
where
    S: Stream<Item = Result<Bytes, LightningError>> + Send + Unpin + 'static,
{
    let stream_started = Instant::now();
    try_stream! {
        while let Some(chunk) = upstream.next().await {
            let chunk = chunk.map_err(|err| {
                error!(error = %err, "Lightning stream failed");
                err
            })?;
            for event in scheduler.observe_chunk(chunk.len()) {
                log_anchor(&event, false);
            }
            yield chunk;
        }

        for event in scheduler.finish() {
            log_anchor(&event, true);
        }

        let stream_ms = stream_started.elapsed().as_secs_f64() * 1000.0;
        info!(
            total_bytes = scheduler.bytes_streamed(),
            parse_ms = context.parse_ms,
            ttfb_ms = ?metrics.ttfb_ms(),
            stream_ms,
            sample_rate = context.sample_rate,
            output_format = %context.output_format,
            script_length = context.script_length,
            "Lightning stream complete"
        );
    }
}

fn log_anchor(event: &AnchorEvent, end_flush: bool) {
    info!(
        anchor_id = %event.anchor_id,
        anchor_type = %event.anchor_type,
        label = %event.label,
        text = %event.text,
        relative_ms = event.relative_ms,
        end_flush,
        "Semantic anchor reached"
    );
}
