// Zhenwo Engine — Core types
// These are the data structures that flow through the entire engine.
// They are independent of any UI framework and of the transport layer.

use serde::{Deserialize, Serialize};

// ── Coaching mode ──────────────────────────────────────────────────────

/// Which coaching experience the user selected for this turn.
/// The backend switches prompts (and therefore output schema) on this value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoachMode {
    /// Short ready-to-send reply candidates.
    Quick,
    /// Long-form strategy: ANALYSIS / ACTION / NEXT sections.
    Master,
    /// Relationship report — not yet available server-side.
    Report,
}

impl CoachMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoachMode::Quick => "quick",
            CoachMode::Master => "master",
            CoachMode::Report => "report",
        }
    }
}

impl Default for CoachMode {
    fn default() -> Self {
        CoachMode::Master
    }
}

// ── Theme selection ────────────────────────────────────────────────────

/// Visual theme identity. The engine only tracks the selection; palettes
/// live with the embedding UI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    Royal,
    Matcha,
    Lucid,
}

impl ThemeId {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeId::Royal => "Royal Blue",
            ThemeId::Matcha => "Matcha Zen",
            ThemeId::Lucid => "Lucid Paper",
        }
    }

    pub const ALL: [ThemeId; 3] = [ThemeId::Royal, ThemeId::Matcha, ThemeId::Lucid];
}

impl Default for ThemeId {
    fn default() -> Self {
        ThemeId::Royal
    }
}

// ── Messages ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a stored role string. Unknown values fall back to `User`.
    pub fn parse(s: &str) -> Role {
        match s {
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// One message in the visible transcript.
///
/// `content` is the full accumulated text (classified on every render);
/// `reply_units` carries quick-mode reply candidates when the stream
/// produced them; `images` holds data URLs attached by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reply_units: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
            reply_units: vec![],
            images: vec![],
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
            reply_units: vec![],
            images: vec![],
        }
    }
}

// ── User account ───────────────────────────────────────────────────────

/// The signed-in user. `custom_auth` marks accounts from the coaching
/// backend's own `/api/auth` track (vs. any external identity provider
/// the embedding UI may bolt on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub uid: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub custom_auth: bool,
}

impl UserAccount {
    /// Anonymous fallback account for turns sent before sign-in.
    pub fn guest() -> Self {
        UserAccount {
            uid: "guest".into(),
            display_name: "Guest".into(),
            email: None,
            custom_auth: false,
        }
    }
}

// ── Ask request (engine → backend wire shape) ──────────────────────────

/// An image attached to a question, already base64-encoded by the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    pub base64: String,
    pub mime: String,
}

/// Prior turn sent back to the backend for context. Only role + text —
/// images and reply structure stay client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /api/ask`. Field names match the backend exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub images: Vec<ImagePayload>,
    pub mode: CoachMode,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub history: Vec<HistoryEntry>,
}

// ── Stored sessions ────────────────────────────────────────────────────

/// One archived conversation in the per-user history sidebar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: i64,
}

// ── Small helpers ──────────────────────────────────────────────────────

/// Truncate to at most `max` bytes without splitting a UTF-8 sequence.
/// Used when quoting backend error bodies into logs and error messages.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
