// Zhenwo Engine — Chat Turn Workflow
//
// `CoachClient` is the production transport to the coaching backend;
// `run_chat_turn` drives one assistant turn: response stream → frame
// decoder → accumulator → event sink, with the turn-token guard checked
// between frames so a superseded turn stops cleanly.
//
// Dependency rule (one-way):
//   engine/chat.rs → engine/{stream,reply,events,state}, atoms
//   engine/chat.rs has NO import from session.rs — AppState is NEVER
//   locked here. Called by: engine/session.rs (the thin controller).

use crate::atoms::constants::{SESSION_FALLBACK_TITLE, SESSION_TITLE_MAX_CHARS};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{ChunkStream, CoachBackend};
use crate::atoms::types::{AskRequest, ChatMessage, HistoryEntry, truncate_utf8};
use crate::engine::events::{CoachEvent, EventSink};
use crate::engine::reply::{CoachReply, TurnControl};
use crate::engine::state::TurnGuard;
use crate::engine::stream::{FrameKind, StreamDecoder};
use async_trait::async_trait;
use futures::StreamExt;
use log::{error, info, warn};
use reqwest::Client;

// ── Production transport ───────────────────────────────────────────────

pub struct CoachClient {
    client: Client,
    base_url: String,
}

impl CoachClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        CoachClient {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CoachBackend for CoachClient {
    fn name(&self) -> &str {
        "echo-api"
    }

    async fn ask_stream(&self, request: &AskRequest) -> EngineResult<ChunkStream> {
        let url = format!("{}/api/ask", self.base_url.trim_end_matches('/'));
        info!(
            "[chat] POST {} mode={} history={} image(s)={}",
            url,
            request.mode.as_str(),
            request.history.len(),
            request.images.len()
        );

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("[chat] Backend error {}: {}", status, truncate_utf8(&body, 500));
            return Err(EngineError::Api {
                status,
                message: truncate_utf8(&body, 200).to_string(),
            });
        }

        let chunks = response
            .bytes_stream()
            .map(|result| {
                result
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .map_err(EngineError::from)
            })
            .boxed();
        Ok(chunks)
    }
}

// ── Turn runner ────────────────────────────────────────────────────────

/// How a successfully-read stream ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Normal completion (a Done frame, a superseding turn, or the
    /// transport closing). The accumulator holds whatever arrived.
    Completed(CoachReply),
    /// A paywall frame arrived: the caller must discard the in-progress
    /// message entirely and surface the upgrade prompt instead.
    Paywalled,
}

/// Run one assistant turn to completion.
///
/// Transport failures (connect error, non-2xx, mid-stream read error)
/// return `Err` and the partial accumulator is dropped with them — the
/// caller surfaces a single terminal notice and does not retry.
pub async fn run_chat_turn(
    backend: &dyn CoachBackend,
    request: &AskRequest,
    session_id: &str,
    turn_id: &str,
    guard: &TurnGuard,
    sink: &dyn EventSink,
) -> EngineResult<TurnOutcome> {
    let mut chunks = backend.ask_stream(request).await?;
    sink.emit(CoachEvent::TurnStarted {
        session_id: session_id.to_string(),
        turn_id: turn_id.to_string(),
    });

    let mut decoder = StreamDecoder::new();
    let mut reply = CoachReply::new();
    let mut paywalled = false;

    'read: while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;

        if !guard.is_current() {
            info!("[chat] Turn {} superseded — dropping remaining stream", turn_id);
            break 'read;
        }

        let mut frames = Vec::new();
        decoder.push(&chunk, &mut |frame| frames.push(frame));

        for frame in frames {
            let kind = frame.kind;
            let content = frame.content.clone();
            match reply.apply(&frame) {
                TurnControl::Continue => emit_delta(sink, turn_id, kind, content, &reply),
                TurnControl::Finished => break 'read,
                TurnControl::PaywallHit => {
                    paywalled = true;
                    break 'read;
                }
            }
        }
    }
    decoder.finish();

    if paywalled {
        warn!("[chat] Paywall triggered mid-turn {} — rolling back", turn_id);
        sink.emit(CoachEvent::Paywall {
            turn_id: turn_id.to_string(),
        });
        return Ok(TurnOutcome::Paywalled);
    }

    sink.emit(CoachEvent::Complete {
        turn_id: turn_id.to_string(),
        reply_units: reply.reply_units.clone(),
        insight: reply.insight.clone(),
    });
    Ok(TurnOutcome::Completed(reply))
}

/// Translate one applied frame into the matching UI event.
fn emit_delta(
    sink: &dyn EventSink,
    turn_id: &str,
    kind: FrameKind,
    content: Option<String>,
    reply: &CoachReply,
) {
    match kind {
        FrameKind::NewReplyUnit => sink.emit(CoachEvent::ReplyUnitStarted {
            turn_id: turn_id.to_string(),
            index: reply.reply_units.len().saturating_sub(1),
        }),
        FrameKind::ReplyUnitAppend => {
            // An orphan append was a no-op; only report real growth.
            if !reply.reply_units.is_empty() {
                if let Some(text) = content {
                    sink.emit(CoachEvent::ReplyDelta {
                        turn_id: turn_id.to_string(),
                        index: reply.reply_units.len() - 1,
                        text,
                    });
                }
            }
        }
        FrameKind::InsightAppend | FrameKind::AnalysisAppend => {
            if let Some(text) = content {
                sink.emit(CoachEvent::InsightDelta {
                    turn_id: turn_id.to_string(),
                    text,
                });
            }
        }
        FrameKind::PaywallTrigger | FrameKind::Done | FrameKind::Unrecognized => {}
    }
}

// ── Pure helpers ───────────────────────────────────────────────────────

/// Sidebar title for a new session: the first words of the opening
/// question, clipped at a character (not byte) boundary.
pub fn derive_session_title(first_user_message: &str) -> String {
    let trimmed = first_user_message.trim();
    if trimmed.is_empty() {
        return SESSION_FALLBACK_TITLE.to_string();
    }
    let title: String = trimmed.chars().take(SESSION_TITLE_MAX_CHARS).collect();
    if trimmed.chars().count() > SESSION_TITLE_MAX_CHARS {
        format!("{title}...")
    } else {
        title
    }
}

/// Project the transcript onto the wire history shape: role + text only.
pub fn history_for_wire(transcript: &[ChatMessage]) -> Vec<HistoryEntry> {
    transcript
        .iter()
        .map(|m| HistoryEntry {
            role: m.role,
            content: m.content.clone(),
        })
        .collect()
}
