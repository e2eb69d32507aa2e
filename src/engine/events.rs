// Zhenwo Engine — Streaming Events (engine → embedding UI)
// Emitted once per accumulator transition so the UI can show the reply
// "growing" live. The UI re-runs `render::classify` on each event; the
// engine never caches a schema decision across updates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CoachEvent {
    /// The backend accepted the question; frames are about to arrive.
    #[serde(rename = "turn_started")]
    TurnStarted { session_id: String, turn_id: String },

    /// A new quick-reply candidate opened at `index`.
    #[serde(rename = "reply_unit_started")]
    ReplyUnitStarted { turn_id: String, index: usize },

    /// Text appended to the quick-reply candidate at `index`.
    #[serde(rename = "reply_delta")]
    ReplyDelta {
        turn_id: String,
        index: usize,
        text: String,
    },

    /// Text appended to the long-form insight body.
    #[serde(rename = "insight_delta")]
    InsightDelta { turn_id: String, text: String },

    /// Roll back the in-progress message and show the paywall prompt.
    #[serde(rename = "paywall")]
    Paywall { turn_id: String },

    /// The turn finished; final reconstructed state included.
    #[serde(rename = "complete")]
    Complete {
        turn_id: String,
        reply_units: Vec<String>,
        insight: String,
    },

    /// The turn failed; the transcript gets one terminal notice message.
    #[serde(rename = "error")]
    Error { turn_id: String, message: String },
}

/// Anything that wants to observe a turn.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CoachEvent);
}

/// Adapter so UIs can subscribe with a plain closure:
/// `FnSink(|event| app.emit(event))`.
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(CoachEvent) + Send + Sync,
{
    fn emit(&self, event: CoachEvent) {
        (self.0)(event)
    }
}

/// Sink that drops every event. Useful for headless callers and tests.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: CoachEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = CoachEvent::ReplyDelta {
            turn_id: "t-1".into(),
            index: 0,
            text: "Hey".into(),
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["kind"], "reply_delta");
        assert_eq!(v["index"], 0);
    }

    #[test]
    fn closures_are_sinks_through_fnsink() {
        let hits = std::sync::atomic::AtomicUsize::new(0);
        let sink = FnSink(|_event: CoachEvent| {
            hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });
        sink.emit(CoachEvent::Paywall { turn_id: "t".into() });
        assert_eq!(hits.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
