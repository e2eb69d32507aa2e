// Zhenwo — AI relationship-coaching chat engine
// The client-side core of the Zhenwo coaching product: consumes the
// backend's server-sent-event response stream, incrementally rebuilds
// structured message state, classifies it into one of three render
// schemas, and keeps per-user chat history locally. UI-framework free:
// embedders subscribe to events and render the returned data trees.

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::traits::{ChunkStream, CoachBackend};
pub use atoms::types::{
    AskRequest, ChatMessage, ChatSession, CoachMode, HistoryEntry, ImagePayload, Role, ThemeId,
    UserAccount,
};
pub use engine::chat::{run_chat_turn, CoachClient, TurnOutcome};
pub use engine::events::{CoachEvent, EventSink, FnSink, NullSink};
pub use engine::history::HistoryStore;
pub use engine::render::{classify, split_action_options, ActionPart, QuickReplyEntry, RenderSchema};
pub use engine::reply::{CoachReply, TurnControl};
pub use engine::session::CoachSession;
pub use engine::state::{AppState, TurnGuard};
pub use engine::stream::{FrameKind, StreamDecoder, StreamFrame};
