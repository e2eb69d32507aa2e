// Zhenwo Engine — Response Stream Decoder
// Splits the chunked SSE body from the coaching backend into discrete
// frames and classifies each one. Resilient to frames split across chunk
// boundaries and to malformed JSON in individual frames.
//
// Wire format (see AskRequest for the request side):
//   - frames are separated by a blank line (`\n\n`)
//   - a meaningful frame starts with the literal `data: `
//   - the payload is either the `[DONE]` sentinel or a JSON object whose
//     `type` field selects the frame kind

use log::{debug, warn};
use serde_json::Value;

// ── Frames ─────────────────────────────────────────────────────────────

/// What one decoded frame means to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Start a fresh quick-reply candidate.
    NewReplyUnit,
    /// Append text to the newest quick-reply candidate.
    ReplyUnitAppend,
    /// Append text to the long-form insight body.
    InsightAppend,
    /// Append text to the long-form insight body (master-mode stream).
    AnalysisAppend,
    /// Roll back the visible turn and surface the paywall.
    PaywallTrigger,
    /// The turn is complete; no further frames follow.
    Done,
    /// Forward-compatibility: a `type` this client does not know.
    Unrecognized,
}

/// One decoded unit from the wire stream.
#[derive(Debug, Clone)]
pub struct StreamFrame {
    /// The frame text as received, `data: ` prefix included.
    pub raw: String,
    pub kind: FrameKind,
    /// Text payload carried by append-style frames.
    pub content: Option<String>,
}

// ── Decoder ────────────────────────────────────────────────────────────

/// Incremental frame decoder. Feed it response-body chunks as they
/// arrive; it invokes the callback once per fully-received frame, in
/// arrival order, and buffers any trailing partial frame for the next
/// chunk.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        StreamDecoder::default()
    }

    /// True once a `Done` frame has been decoded (or `finish` was called).
    /// Callers should stop reading the transport at that point.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Append one transport chunk and emit every frame it completes.
    pub fn push<F: FnMut(StreamFrame)>(&mut self, chunk: &str, on_frame: &mut F) {
        if self.finished {
            return;
        }
        self.buffer.push_str(chunk);

        while let Some(boundary) = self.buffer.find("\n\n") {
            let raw: String = self.buffer[..boundary].to_string();
            self.buffer.drain(..boundary + 2);

            if let Some(frame) = parse_frame(&raw) {
                let done = frame.kind == FrameKind::Done;
                on_frame(frame);
                if done {
                    // The server closes the stream after [DONE]; anything
                    // still buffered is not part of this turn.
                    self.finished = true;
                    self.buffer.clear();
                    return;
                }
            }
        }
    }

    /// Signal end of transport. A partial frame left in the buffer without
    /// a `Done` is a normal termination, not an error — discard it.
    pub fn finish(&mut self) {
        if !self.finished && !self.buffer.trim().is_empty() {
            warn!(
                "[stream] Transport ended with {} unterminated byte(s) buffered — discarding",
                self.buffer.len()
            );
        }
        self.buffer.clear();
        self.finished = true;
    }
}

// ── Per-frame parsing ──────────────────────────────────────────────────

/// Decode one raw frame. Returns `None` for frames that carry nothing for
/// the consumer: missing `data: ` prefix, or JSON that does not parse
/// (malformed payloads are scoped to their frame, never the stream).
fn parse_frame(raw: &str) -> Option<StreamFrame> {
    let payload = match raw.strip_prefix("data: ") {
        Some(p) => p,
        None => {
            if !raw.trim().is_empty() {
                debug!("[stream] Ignoring non-data frame ({} bytes)", raw.len());
            }
            return None;
        }
    };

    if payload.trim() == "[DONE]" {
        return Some(StreamFrame {
            raw: raw.to_string(),
            kind: FrameKind::Done,
            content: None,
        });
    }

    let v: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!("[stream] Skipping malformed frame: {}", e);
            return None;
        }
    };

    let kind = match v["type"].as_str().unwrap_or("") {
        "newImmediateReply" => FrameKind::NewReplyUnit,
        "immediateReply" => FrameKind::ReplyUnitAppend,
        "coachInsight" => FrameKind::InsightAppend,
        "analysis" => FrameKind::AnalysisAppend,
        "paywall_trigger" => FrameKind::PaywallTrigger,
        "done" => FrameKind::Done,
        other => {
            debug!("[stream] Unrecognized frame type '{}'", other);
            FrameKind::Unrecognized
        }
    };

    Some(StreamFrame {
        raw: raw.to_string(),
        kind,
        content: v["content"].as_str().map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_in_chunks(chunks: &[&str]) -> Vec<StreamFrame> {
        let mut decoder = StreamDecoder::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            decoder.push(chunk, &mut |f| frames.push(f));
        }
        decoder.finish();
        frames
    }

    const STREAM: &str = "data: {\"type\":\"newImmediateReply\"}\n\n\
        data: {\"type\":\"immediateReply\",\"content\":\"Hey, \"}\n\n\
        data: {\"type\":\"immediateReply\",\"content\":\"I get it.\"}\n\n\
        data: {\"type\":\"coachInsight\",\"content\":\"Long game: \"}\n\n\
        data: [DONE]\n\n";

    #[test]
    fn decodes_whole_stream() {
        let frames = decode_in_chunks(&[STREAM]);
        let kinds: Vec<FrameKind> = frames.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FrameKind::NewReplyUnit,
                FrameKind::ReplyUnitAppend,
                FrameKind::ReplyUnitAppend,
                FrameKind::InsightAppend,
                FrameKind::Done,
            ]
        );
        assert_eq!(frames[1].content.as_deref(), Some("Hey, "));
        assert!(frames[0].raw.starts_with("data: "));
    }

    #[test]
    fn output_is_chunk_boundary_invariant() {
        let whole = decode_in_chunks(&[STREAM]);

        // One byte at a time
        let tiny: Vec<String> = STREAM.chars().map(|c| c.to_string()).collect();
        let tiny_refs: Vec<&str> = tiny.iter().map(|s| s.as_str()).collect();
        let frames = decode_in_chunks(&tiny_refs);
        assert_eq!(frames.len(), whole.len());

        // Awkward split through a frame terminator
        let (a, b) = STREAM.split_at(STREAM.find("\n\n").unwrap() + 1);
        let frames = decode_in_chunks(&[a, b]);
        assert_eq!(frames.len(), whole.len());

        for (x, y) in whole.iter().zip(&frames) {
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.content, y.content);
        }
    }

    #[test]
    fn done_sentinel_stops_decoding() {
        let mut decoder = StreamDecoder::new();
        let mut frames = Vec::new();
        decoder.push(
            "data: [DONE]\n\ndata: {\"type\":\"analysis\",\"content\":\"late\"}\n\n",
            &mut |f| frames.push(f),
        );
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, FrameKind::Done);
        assert!(decoder.is_finished());

        // Further pushes are no-ops
        decoder.push("data: {\"type\":\"analysis\",\"content\":\"x\"}\n\n", &mut |f| {
            frames.push(f)
        });
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn json_done_frame_also_terminates() {
        let frames = decode_in_chunks(&["data: {\"type\":\"done\"}\n\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, FrameKind::Done);
    }

    #[test]
    fn malformed_frame_is_skipped_not_fatal() {
        let frames = decode_in_chunks(&[
            "data: {\"type\":\"analysis\",\"content\":\"a\"}\n\n\
             data: {not json at all\n\n\
             data: {\"type\":\"analysis\",\"content\":\"b\"}\n\n",
        ]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].content.as_deref(), Some("a"));
        assert_eq!(frames[1].content.as_deref(), Some("b"));
    }

    #[test]
    fn frames_without_data_prefix_are_ignored() {
        let frames = decode_in_chunks(&[": keepalive\n\nevent: ping\n\ndata: [DONE]\n\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, FrameKind::Done);
    }

    #[test]
    fn unknown_type_maps_to_unrecognized() {
        let frames = decode_in_chunks(&["data: {\"type\":\"usage\",\"tokens\":12}\n\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, FrameKind::Unrecognized);
        assert_eq!(frames[0].content, None);
    }

    #[test]
    fn abrupt_end_mid_frame_is_clean() {
        let mut decoder = StreamDecoder::new();
        let mut frames = Vec::new();
        decoder.push(
            "data: {\"type\":\"analysis\",\"content\":\"done part\"}\n\ndata: {\"type\":\"anal",
            &mut |f| frames.push(f),
        );
        assert_eq!(frames.len(), 1);
        decoder.finish();
        assert!(decoder.is_finished());
        // Already-emitted frames remain valid; partial buffer discarded.
        assert_eq!(frames[0].content.as_deref(), Some("done part"));
    }

    #[test]
    fn partial_json_completes_across_chunks() {
        let frames = decode_in_chunks(&[
            "data: {\"type\":\"immed",
            "iateReply\",\"content\":\"hi\"}",
            "\n\n",
        ]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, FrameKind::ReplyUnitAppend);
        assert_eq!(frames[0].content.as_deref(), Some("hi"));
    }
}
