// Zhenwo Engine — Turn Accumulator
// Applies decoded stream frames, in arrival order, to the mutable
// reconstruction of one assistant turn. Owned exclusively by the turn
// that created it; a new turn never reads a previous turn's accumulator.

use crate::engine::stream::{FrameKind, StreamFrame};

/// What the caller should do after applying a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnControl {
    /// Keep reading; re-render the growing message.
    Continue,
    /// The turn is complete; the accumulator is frozen.
    Finished,
    /// Roll back the visible message and surface the paywall prompt.
    PaywallHit,
}

/// The reconstruction target for one assistant turn.
#[derive(Debug, Clone, Default)]
pub struct CoachReply {
    /// Independent short reply candidates (quick mode). Ordered.
    pub reply_units: Vec<String>,
    /// Append-only long-form text (master / analysis modes).
    pub insight: String,
    frozen: bool,
}

impl CoachReply {
    pub fn new() -> Self {
        CoachReply::default()
    }

    /// Apply one frame. Pure transition: every input maps to exactly one
    /// effect, and nothing here can fail — a frame that has no valid
    /// target (e.g. an append with no reply unit open) is a visible no-op.
    pub fn apply(&mut self, frame: &StreamFrame) -> TurnControl {
        if self.frozen {
            return TurnControl::Finished;
        }
        match frame.kind {
            FrameKind::NewReplyUnit => {
                self.reply_units.push(String::new());
            }
            FrameKind::ReplyUnitAppend => {
                // The stream sent an append before any newImmediateReply:
                // show no change rather than fail.
                if let (Some(last), Some(content)) =
                    (self.reply_units.last_mut(), frame.content.as_deref())
                {
                    last.push_str(content);
                }
            }
            FrameKind::InsightAppend | FrameKind::AnalysisAppend => {
                if let Some(content) = frame.content.as_deref() {
                    self.insight.push_str(content);
                }
            }
            FrameKind::PaywallTrigger => {
                self.frozen = true;
                return TurnControl::PaywallHit;
            }
            FrameKind::Done => {
                self.frozen = true;
                return TurnControl::Finished;
            }
            FrameKind::Unrecognized => {}
        }
        TurnControl::Continue
    }

    /// No text has arrived on either track yet.
    pub fn is_empty(&self) -> bool {
        self.insight.is_empty() && self.reply_units.iter().all(|u| u.is_empty())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}
