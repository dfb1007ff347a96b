//! Server-sent event frame parser
//!
//! The chat endpoint answers with `data: <json>\n\n` frames and closes the
//! sequence with a `data: [DONE]` frame. Read chunks are not aligned to frames,
//! so bytes are buffered until a blank line completes a frame; the incomplete
//! tail stays in the buffer for the next chunk. Payloads are decoded as UTF-8
//! only once their frame is complete, which keeps multi-byte characters that
//! straddle a chunk boundary intact.

use async_stream::stream;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio_stream::Stream;
use tracing::{debug, warn};

use crate::{
    error::Result,
    stream::{EventStream, StreamEvent},
};

/// Payload that terminates the event sequence
pub const DONE_MARKER: &str = "[DONE]";

const FRAME_SEPARATOR: &[u8] = b"\n\n";

/// Accumulates raw bytes and splits out complete frames
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
    /// Bytes before this offset are known not to start a separator
    scanned: usize,
}

impl FrameBuffer {
    /// Create an empty frame buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the data payload of every frame it completes.
    ///
    /// Frames without a `data` field (comments, keep-alives) produce nothing.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // CRLF framing is legal SSE; JSON payloads never carry a raw `\r`
        self.buf
            .extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(end) = self.find_separator() {
            let frame = self.buf.split_to(end + FRAME_SEPARATOR.len());
            self.scanned = 0;
            match std::str::from_utf8(&frame[..end]) {
                Ok(text) => {
                    if let Some(data) = frame_data(text) {
                        payloads.push(data);
                    }
                }
                Err(e) => warn!(error = %e, "Dropping frame with invalid UTF-8"),
            }
        }
        payloads
    }

    /// Number of buffered bytes not yet forming a complete frame
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Position of the next separator, resuming where the last search stopped
    fn find_separator(&mut self) -> Option<usize> {
        let found = self.buf[self.scanned..]
            .windows(FRAME_SEPARATOR.len())
            .position(|w| w == FRAME_SEPARATOR)
            .map(|pos| self.scanned + pos);
        if found.is_none() {
            // The last byte may be the first half of a separator
            self.scanned = self.buf.len().saturating_sub(FRAME_SEPARATOR.len() - 1);
        }
        found
    }
}

/// Extract the data payload of one frame, joining multi-line data with `\n`.
fn frame_data(frame: &str) -> Option<String> {
    let mut data: Option<String> = None;
    for line in frame.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            let value = rest.strip_prefix(' ').unwrap_or(rest);
            match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
        // `event:`, `id:` and `retry:` carry nothing this protocol uses
    }
    data
}

/// A classified frame payload
#[derive(Debug, PartialEq)]
pub enum Payload {
    /// The end-of-stream marker
    Done,
    /// A decoded event
    Event(StreamEvent),
    /// Payload that failed to decode, with the decoder's message
    Malformed(String),
}

/// Classify a frame payload. The marker is matched exactly, before any JSON parsing.
pub fn parse_payload(data: &str) -> Payload {
    if data == DONE_MARKER {
        return Payload::Done;
    }
    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => Payload::Event(event),
        Err(e) => Payload::Malformed(e.to_string()),
    }
}

/// Decode a chunked response body into a lazy stream of events.
///
/// The stream ends after the `[DONE]` frame or when the body ends. A chunk read
/// error is yielded once and ends the stream. Malformed frames are logged and
/// skipped.
pub fn decode_frames<S>(mut chunks: S) -> EventStream
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin + 'static,
{
    Box::pin(stream! {
        let mut frames = FrameBuffer::new();

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for data in frames.push(&chunk) {
                match parse_payload(&data) {
                    Payload::Done => {
                        debug!("Received end-of-stream marker");
                        return;
                    }
                    Payload::Event(event) => {
                        debug!(kind = event.kind(), "Decoded frame");
                        yield Ok(event);
                    }
                    Payload::Malformed(error) => {
                        warn!(
                            error = %error,
                            data_preview = %truncate_chars(&data, 100),
                            "Dropping malformed frame"
                        );
                    }
                }
            }
        }

        if frames.pending() > 0 {
            debug!(bytes = frames.pending(), "Body ended inside a frame, discarding tail");
        }
    })
}

fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::AgentStatus;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes>> + Send + Unpin + 'static {
        let items: Vec<Result<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        futures::stream::iter(items)
    }

    async fn collect_ok(parts: &[&str]) -> Vec<StreamEvent> {
        decode_frames(chunks(parts))
            .map(|r| r.expect("unexpected stream error"))
            .collect()
            .await
    }

    // --- FrameBuffer ---

    #[test]
    fn test_single_frame() {
        let mut buf = FrameBuffer::new();
        let out = buf.push(b"data: {\"type\":\"text\",\"content\":\"hi\"}\n\n");
        assert_eq!(out, vec![r#"{"type":"text","content":"hi"}"#.to_string()]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_incomplete_tail_is_kept() {
        let mut buf = FrameBuffer::new();
        let out = buf.push(b"data: {\"a\":1}\n\ndata: {\"b\"");
        assert_eq!(out, vec![r#"{"a":1}"#.to_string()]);
        assert_eq!(buf.pending(), "data: {\"b\"".len());

        let out = buf.push(b":2}\n\n");
        assert_eq!(out, vec![r#"{"b":2}"#.to_string()]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_separator_split_across_chunks() {
        let mut buf = FrameBuffer::new();
        assert!(buf.push(b"data: {\"a\":1}\n").is_empty());
        assert_eq!(buf.push(b"\n"), vec![r#"{"a":1}"#.to_string()]);
    }

    #[test]
    fn test_large_frame_fed_bytewise() {
        let content = "x".repeat(64 * 1024);
        let frame = format!("data: {{\"type\":\"text\",\"content\":\"{}\"}}\n\n", content);
        let mut buf = FrameBuffer::new();
        let mut out = Vec::new();
        for byte in frame.as_bytes() {
            out.extend(buf.push(std::slice::from_ref(byte)));
            assert!(buf.scanned <= buf.pending());
        }
        assert_eq!(out.len(), 1);
        assert!(out[0].ends_with(&format!("{}\"}}", content)));
        assert_eq!(buf.pending(), 0);
        assert_eq!(buf.scanned, 0);
    }

    #[test]
    fn test_scan_resumes_after_partial_separator() {
        let mut buf = FrameBuffer::new();
        assert!(buf.push(b"data: {\"a\":1}").is_empty());
        assert_eq!(buf.scanned, buf.pending() - 1);
        assert!(buf.push(b"\n").is_empty());
        assert_eq!(buf.scanned, buf.pending() - 1);
        let out = buf.push(b"\ndata: {\"b\":2}\n\n");
        assert_eq!(out, vec![r#"{"a":1}"#.to_string(), r#"{"b":2}"#.to_string()]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_crlf_framing() {
        let mut buf = FrameBuffer::new();
        let out = buf.push(b"data: {\"cr\":true}\r\n\r\n");
        assert_eq!(out, vec![r#"{"cr":true}"#.to_string()]);
    }

    #[test]
    fn test_comments_and_other_fields_ignored() {
        let mut buf = FrameBuffer::new();
        let out = buf.push(b": keep-alive\n\nevent: message\nid: 7\ndata: {\"v\":1}\n\n");
        assert_eq!(out, vec![r#"{"v":1}"#.to_string()]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut buf = FrameBuffer::new();
        let out = buf.push(b"data: {\"v\":\ndata: 1}\n\n");
        assert_eq!(out, vec!["{\"v\":\n1}".to_string()]);
    }

    #[test]
    fn test_data_without_space() {
        let mut buf = FrameBuffer::new();
        assert_eq!(buf.push(b"data:[DONE]\n\n"), vec!["[DONE]".to_string()]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let frame = "data: {\"type\":\"text\",\"content\":\"✓ done\"}\n\n".as_bytes();
        let split = frame.iter().position(|&b| b == 0xE2).unwrap() + 1;
        let mut buf = FrameBuffer::new();
        assert!(buf.push(&frame[..split]).is_empty());
        let out = buf.push(&frame[split..]);
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("✓ done"));
    }

    // --- parse_payload ---

    #[test]
    fn test_done_marker_exact_match() {
        assert_eq!(parse_payload("[DONE]"), Payload::Done);
        assert!(matches!(parse_payload("[DONE] "), Payload::Malformed(_)));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(parse_payload("{\"type\":\"text\""), Payload::Malformed(_)));
        assert!(matches!(parse_payload("not json"), Payload::Malformed(_)));
    }

    #[test]
    fn test_architecture_with_null_leaves_is_an_event() {
        let data = r#"{"type":"architecture","data":{"name":"shop","total_cost":null,"application_stacks":[{"name":"web","services":[{"name":"api","status":null,"cost_estimate":{"monthly":null}}]}],"connections":null}}"#;
        match parse_payload(data) {
            Payload::Event(StreamEvent::Architecture { data }) => {
                assert_eq!(data.name, "shop");
                assert_eq!(data.total_cost, 0.0);
                assert!(data.connections.is_empty());
                let api = data.services().next().expect("service");
                assert_eq!(api.status, "");
                assert_eq!(api.cost_estimate.as_ref().map(|c| c.monthly), Some(0.0));
            }
            other => panic!("expected architecture event, got {:?}", other),
        }
    }

    // --- decode_frames ---

    #[tokio::test]
    async fn test_decode_stops_at_done() {
        let events = collect_ok(&[
            "data: {\"type\":\"text\",\"content\":\"a\"}\n\n",
            "data: [DONE]\n\n",
            "data: {\"type\":\"text\",\"content\":\"after\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_decode_reassembles_truncated_json() {
        let events = collect_ok(&[
            "data: {\"type\":\"agent_status\",\"agent_id\":\"cloud-arch",
            "itecture\",\"status\":\"work",
            "ing\"}\n\ndata: [DONE]\n\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            StreamEvent::AgentStatus {
                agent_id: "cloud-architecture".into(),
                agent_name: None,
                status: AgentStatus::Working,
                current_task: None,
                activity: None,
            }
        );
    }

    #[tokio::test]
    async fn test_decode_drops_malformed_and_continues() {
        let events = collect_ok(&[
            "data: {\"type\":\"text\",\"content\":\"one\"}\n\n",
            "data: {broken\n\n",
            "data: {\"type\":\"mystery\"}\n\n",
            "data: {\"type\":\"text\",\"content\":\"two\"}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind(), "text");
    }

    #[tokio::test]
    async fn test_decode_body_end_without_marker() {
        let events = collect_ok(&[
            "data: {\"type\":\"text\",\"content\":\"x\"}\n\n",
            "data: {\"type\":\"text\",\"con",
        ])
        .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_decode_empty_body() {
        let events = collect_ok(&[]).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_decode_read_error_ends_stream() {
        let items: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from("data: {\"type\":\"text\",\"content\":\"partial\"}\n\n")),
            Err(Error::Sse("connection reset".into())),
            Ok(Bytes::from("data: {\"type\":\"text\",\"content\":\"lost\"}\n\n")),
        ];
        let results: Vec<Result<StreamEvent>> =
            decode_frames(futures::stream::iter(items)).collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Sse(_))));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("✓✓✓✓", 2), "✓✓...");
    }
}
