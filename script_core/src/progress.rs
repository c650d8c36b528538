//! Playback progress estimation and anchor scheduling.
//!
//! There is no feedback channel from the audio renderer, so playback
//! position is approximated from two heuristics: total duration from the
//! script's word count, and elapsed time from the cumulative PCM bytes
//! already streamed. `relative_ms` values are best-effort telemetry, not
//! a scheduling guarantee; the end-of-stream flush is what guarantees
//! every anchor fires exactly once.

use serde::Serialize;

use crate::{AnchorType, SemanticAnchor};

/// Average speaking rate used for the word-count duration heuristic.
pub const WORDS_PER_SECOND: f64 = 2.6;

/// Mono 16-bit little-endian PCM.
pub const BYTES_PER_SAMPLE: u64 = 2;

/// Estimate total speech duration from word count, floored at one second.
pub fn estimate_speech_duration_secs(text: &str) -> f64 {
    let words = text.split_whitespace().count().max(1);
    (words as f64 / WORDS_PER_SECOND).max(1.0)
}

/// Notification emitted when estimated playback crosses an anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorEvent {
    pub anchor_id: String,
    pub anchor_type: AnchorType,
    pub label: String,
    pub text: String,
    pub relative_ms: u64,
}

/// Fires anchor notifications as estimated playback progress crosses each
/// anchor's relative position in the script text.
///
/// `observe_chunk` runs inline on the chunk-forwarding path and must stay
/// cheap: it advances a cursor over the sorted anchor list, nothing more.
#[derive(Debug)]
pub struct AnchorScheduler {
    anchors: Vec<SemanticAnchor>,
    total_chars: usize,
    estimated_duration_secs: f64,
    bytes_per_second: u64,
    bytes_streamed: u64,
    cursor: usize,
}

impl AnchorScheduler {
    pub fn new(script_text: &str, mut anchors: Vec<SemanticAnchor>, sample_rate: u32) -> Self {
        anchors.sort_by_key(|anchor| anchor.span_end);
        Self {
            total_chars: script_text.len().max(1),
            estimated_duration_secs: estimate_speech_duration_secs(script_text),
            bytes_per_second: (sample_rate as u64 * BYTES_PER_SAMPLE).max(1),
            bytes_streamed: 0,
            cursor: 0,
            anchors,
        }
    }

    pub fn estimated_duration_secs(&self) -> f64 {
        self.estimated_duration_secs
    }

    pub fn bytes_streamed(&self) -> u64 {
        self.bytes_streamed
    }

    /// Record a forwarded chunk and return the anchors whose position the
    /// estimated playback has now crossed, in ascending threshold order.
    pub fn observe_chunk(&mut self, chunk_len: usize) -> Vec<AnchorEvent> {
        self.bytes_streamed += chunk_len as u64;
        let progress = self.progress();

        let mut fired = Vec::new();
        while self.cursor < self.anchors.len() {
            if progress < self.threshold(&self.anchors[self.cursor]) {
                break;
            }
            fired.push(self.event_at(self.cursor));
            self.cursor += 1;
        }
        fired
    }

    /// Flush-fire every anchor estimation did not reach before the byte
    /// stream ended. Guarantees exactly-once delivery per request.
    pub fn finish(&mut self) -> Vec<AnchorEvent> {
        let mut fired = Vec::new();
        while self.cursor < self.anchors.len() {
            fired.push(self.event_at(self.cursor));
            self.cursor += 1;
        }
        fired
    }

    fn progress(&self) -> f64 {
        let elapsed_audio_secs = self.bytes_streamed as f64 / self.bytes_per_second as f64;
        (elapsed_audio_secs / self.estimated_duration_secs.max(0.001)).min(1.0)
    }

    fn threshold(&self, anchor: &SemanticAnchor) -> f64 {
        anchor.span_end as f64 / self.total_chars as f64
    }

    fn event_at(&self, index: usize) -> AnchorEvent {
        let anchor = &self.anchors[index];
        AnchorEvent {
            anchor_id: anchor.anchor_id.clone(),
            anchor_type: anchor.anchor_type,
            label: anchor.label.clone(),
            text: anchor.text.clone(),
            relative_ms: (self.threshold(anchor) * self.estimated_duration_secs * 1000.0).round()
                as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latex_to_teaching_script;

    const SAMPLE_RATE: u32 = 24_000;

    fn script_with_anchors() -> (String, Vec<SemanticAnchor>) {
        let script = latex_to_teaching_script(
            "A student asked about limits. Plain filler sentence here. \
             The prof's trick is symmetry. The key idea is continuity.",
        );
        assert_eq!(script.anchors.len(), 3);
        (script.text, script.anchors)
    }

    /// Enough PCM bytes to cover the full estimated duration.
    fn full_stream_bytes(text: &str) -> usize {
        let secs = estimate_speech_duration_secs(text);
        (secs * SAMPLE_RATE as f64 * BYTES_PER_SAMPLE as f64).ceil() as usize + 1
    }

    #[test]
    fn duration_estimate_floors_at_one_second() {
        assert_eq!(estimate_speech_duration_secs(""), 1.0);
        assert_eq!(estimate_speech_duration_secs("hi"), 1.0);
        let long = "word ".repeat(260);
        assert!((estimate_speech_duration_secs(&long) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fires_every_anchor_exactly_once_single_chunk() {
        let (text, anchors) = script_with_anchors();
        let mut scheduler = AnchorScheduler::new(&text, anchors, SAMPLE_RATE);

        let mut events = scheduler.observe_chunk(full_stream_bytes(&text));
        events.extend(scheduler.finish());

        let ids: Vec<&str> = events.iter().map(|e| e.anchor_id.as_str()).collect();
        assert_eq!(ids, ["anchor_1", "anchor_2", "anchor_3"]);
    }

    #[test]
    fn fires_every_anchor_exactly_once_many_chunks() {
        let (text, anchors) = script_with_anchors();
        let mut scheduler = AnchorScheduler::new(&text, anchors, SAMPLE_RATE);

        let total = full_stream_bytes(&text);
        let chunk = (total / 1000).max(1);
        let mut events = Vec::new();
        let mut sent = 0;
        while sent < total {
            let len = chunk.min(total - sent);
            events.extend(scheduler.observe_chunk(len));
            sent += len;
        }
        events.extend(scheduler.finish());

        let ids: Vec<&str> = events.iter().map(|e| e.anchor_id.as_str()).collect();
        assert_eq!(ids, ["anchor_1", "anchor_2", "anchor_3"]);
        assert_eq!(scheduler.bytes_streamed(), total as u64);
    }

    #[test]
    fn end_of_stream_flushes_unreached_anchors() {
        let (text, anchors) = script_with_anchors();
        let mut scheduler = AnchorScheduler::new(&text, anchors, SAMPLE_RATE);

        // Stream ends after a single tiny chunk; estimation reaches nothing.
        let early = scheduler.observe_chunk(4);
        assert!(early.is_empty());

        let flushed = scheduler.finish();
        assert_eq!(flushed.len(), 3);
        // A second finish must not re-fire.
        assert!(scheduler.finish().is_empty());
    }

    #[test]
    fn relative_ms_is_monotonic_and_bounded() {
        let (text, anchors) = script_with_anchors();
        let mut scheduler = AnchorScheduler::new(&text, anchors, SAMPLE_RATE);
        let events = scheduler.finish();

        let duration_ms = (scheduler.estimated_duration_secs() * 1000.0).round() as u64;
        let mut prev = 0;
        for event in &events {
            assert!(event.relative_ms >= prev);
            assert!(event.relative_ms <= duration_ms);
            prev = event.relative_ms;
        }
    }

    #[test]
    fn unsorted_anchors_are_sorted_by_span_end() {
        let (text, mut anchors) = script_with_anchors();
        anchors.reverse();
        let mut scheduler = AnchorScheduler::new(&text, anchors, SAMPLE_RATE);
        let events = scheduler.finish();
        let ids: Vec<&str> = events.iter().map(|e| e.anchor_id.as_str()).collect();
        assert_eq!(ids, ["anchor_1", "anchor_2", "anchor_3"]);
    }

    #[test]
    fn progress_is_capped_at_full_script() {
        let (text, anchors) = script_with_anchors();
        let mut scheduler = AnchorScheduler::new(&text, anchors, SAMPLE_RATE);
        // Vastly more bytes than the estimate; every anchor fires, once.
        let events = scheduler.observe_chunk(full_stream_bytes(&text) * 10);
        assert_eq!(events.len(), 3);
        assert!(scheduler.finish().is_empty());
    }
}
