//! Server-sent-event framing for the Lightning audio stream.
//!
//! The upstream may deliver audio as SSE frames instead of raw chunked
//! bytes. Each frame carries an event name and one or more `data:` lines;
//! frames named `audio` hold a JSON body whose base64 `audio` field is the
//! PCM payload. The parser is a two-state machine (`Idle`, `Accumulating`)
//! so the reset-on-blank-line and flush-on-stream-end behavior stays an
//! explicit invariant rather than free-floating mutable state.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Between frames; blank lines are no-ops.
    Idle,
    /// Inside a frame; a blank line closes it.
    Accumulating,
}

/// Incremental SSE parser scoped to one stream parse.
///
/// Buffered state (current event name, accumulated data lines, partial
/// line bytes) is discarded when the parser is dropped, so a cancelled
/// stream never flushes partial frames.
#[derive(Debug)]
pub struct SseParser {
    state: ParserState,
    current_event: String,
    data_lines: Vec<String>,
    line_buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Idle,
            current_event: String::new(),
            data_lines: Vec::new(),
            line_buffer: Vec::new(),
        }
    }

    /// Feed one transport chunk. Returns the decoded audio payload of
    /// every frame completed by this chunk, already filtered to non-empty
    /// payloads. Partial lines are buffered across chunk boundaries.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut payloads = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let line = self.take_buffered_line();
                if let Some(payload) = self.push_line(&line) {
                    payloads.push(payload);
                }
            } else {
                self.line_buffer.push(byte);
            }
        }
        payloads
    }

    /// Flush a trailing frame when the transport closes without a final
    /// blank line.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if !self.line_buffer.is_empty() {
            let line = self.take_buffered_line();
            if let Some(payload) = self.push_line(&line) {
                return Some(payload);
            }
        }
        self.close_frame()
    }

    fn take_buffered_line(&mut self) -> String {
        let mut line = std::mem::take(&mut self.line_buffer);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }

    fn push_line(&mut self, line: &str) -> Option<Vec<u8>> {
        if let Some(rest) = line.strip_prefix("event:") {
            self.current_event = rest.trim().to_string();
            self.state = ParserState::Accumulating;
            return None;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data_lines.push(rest.trim().to_string());
            self.state = ParserState::Accumulating;
            return None;
        }
        if !line.trim().is_empty() {
            // Comment or unknown field; skipped, not an error.
            return None;
        }
        match self.state {
            ParserState::Idle => None,
            ParserState::Accumulating => self.close_frame(),
        }
    }

    fn close_frame(&mut self) -> Option<Vec<u8>> {
        let event = std::mem::take(&mut self.current_event);
        let data_lines = std::mem::take(&mut self.data_lines);
        self.state = ParserState::Idle;

        if event != "audio" || data_lines.is_empty() {
            return None;
        }
        let payload = extract_audio(&data_lines.join("\n"));
        if payload.is_empty() {
            None
        } else {
            Some(payload)
        }
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the base64 `audio` field from an event's JSON body.
/// Malformed bodies yield no audio rather than an error.
fn extract_audio(payload_text: &str) -> Vec<u8> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(payload_text) else {
        return Vec::new();
    };
    let Some(audio_b64) = value.get("audio").and_then(|v| v.as_str()) else {
        return Vec::new();
    };
    STANDARD.decode(audio_b64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_frame(pcm: &[u8]) -> String {
        let b64 = STANDARD.encode(pcm);
        format!("event: audio\ndata: {{\"audio\": \"{b64}\", \"done\": false}}\n\n")
    }

    #[test]
    fn decodes_audio_event_payload() {
        let pcm = [0x01, 0x02, 0x03, 0x04];
        let mut parser = SseParser::new();
        let payloads = parser.feed(audio_frame(&pcm).as_bytes());
        assert_eq!(payloads, vec![pcm.to_vec()]);
    }

    #[test]
    fn reassembles_frames_split_across_chunks() {
        let pcm = [0xAA, 0xBB, 0xCC];
        let frame = audio_frame(&pcm);
        let (head, tail) = frame.as_bytes().split_at(frame.len() / 2);

        let mut parser = SseParser::new();
        let mut payloads = parser.feed(head);
        payloads.extend(parser.feed(tail));
        assert_eq!(payloads, vec![pcm.to_vec()]);
    }

    #[test]
    fn skips_non_audio_events() {
        let mut parser = SseParser::new();
        let payloads = parser.feed(b"event: status\ndata: {\"status\": \"started\"}\n\n");
        assert!(payloads.is_empty());
    }

    #[test]
    fn skips_malformed_json_silently() {
        let mut parser = SseParser::new();
        let payloads = parser.feed(b"event: audio\ndata: not-json\n\n");
        assert!(payloads.is_empty());
        assert!(parser.finish().is_none());
    }

    #[test]
    fn skips_missing_or_empty_audio_field() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: audio\ndata: {\"done\": true}\n\n").is_empty());
        assert!(parser.feed(b"event: audio\ndata: {\"audio\": \"\"}\n\n").is_empty());
    }

    #[test]
    fn flushes_unterminated_trailing_frame() {
        let pcm = [0x10, 0x20];
        let b64 = STANDARD.encode(pcm);
        let body = format!("event: audio\ndata: {{\"audio\": \"{b64}\"}}");

        let mut parser = SseParser::new();
        assert!(parser.feed(body.as_bytes()).is_empty());
        assert_eq!(parser.finish(), Some(pcm.to_vec()));
    }

    #[test]
    fn handles_crlf_line_endings() {
        let pcm = [0x42];
        let b64 = STANDARD.encode(pcm);
        let body = format!("event: audio\r\ndata: {{\"audio\": \"{b64}\"}}\r\n\r\n");

        let mut parser = SseParser::new();
        let payloads = parser.feed(body.as_bytes());
        assert_eq!(payloads, vec![pcm.to_vec()]);
    }

    #[test]
    fn blank_lines_between_frames_are_no_ops() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"\n\n\n").is_empty());
        assert!(parser.finish().is_none());
    }

    #[test]
    fn accumulates_multiple_data_lines() {
        // JSON body split over two data: lines is rejoined before parsing.
        let pcm = [0x07, 0x08];
        let b64 = STANDARD.encode(pcm);
        let body = format!("event: audio\ndata: {{\"audio\":\ndata: \"{b64}\"}}\n\n");

        let mut parser = SseParser::new();
        let payloads = parser.feed(body.as_bytes());
        assert_eq!(payloads, vec![pcm.to_vec()]);
    }
}
