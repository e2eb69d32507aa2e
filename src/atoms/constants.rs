// ── Zhenwo Atoms: Constants ────────────────────────────────────────────────
// All named product constants for the crate live here.
// Rationale: collecting constants in one place eliminates magic strings,
// makes auditing easier, and keeps every layer's code self-documenting.

// ── Coach backend ──────────────────────────────────────────────────────────
// The hosted coaching API. Override per-environment via `CoachSession::new`.
pub const DEFAULT_BASE_URL: &str = "https://echo-api-6d3i.onrender.com";

// ── Master-mode ACTION section prompt contract ─────────────────────────────
// The backend's master prompt instructs the model to format suggested
// replies inside the ACTION section as:
//
//   **Option 1 — De-escalate**
//   Copy this: "I hear you, and I want to understand."
//   (Why: lowers the temperature without conceding the point.)
//
// The renderer splits on the heading marker, lifts the `Copy this:` payload
// out as a copyable string, and keeps the commentary. Changing the prompt
// wording requires updating these three literals together.
pub(crate) const ACTION_OPTION_HEADING: &str = "**Option";
pub(crate) const COPY_INSTRUCTION_MARKER: &str = "Copy this:";
pub(crate) const COMMENTARY_MARKER: &str = "(Why";

// ── Master-mode section names ──────────────────────────────────────────────
// A section NAME spans `:::NAME:::` … `:::END_NAME:::` in the model output.
pub(crate) const SECTION_ANALYSIS: &str = "ANALYSIS";
pub(crate) const SECTION_ACTION: &str = "ACTION";
pub(crate) const SECTION_NEXT: &str = "NEXT";

// ── Session history ────────────────────────────────────────────────────────
// Sidebar titles are clipped to this many characters of the first message.
pub(crate) const SESSION_TITLE_MAX_CHARS: usize = 12;
pub(crate) const SESSION_FALLBACK_TITLE: &str = "New Strategy";
// Most-recent sessions shown in the archive sidebar.
pub(crate) const HISTORY_LIST_LIMIT: i64 = 50;
// Sessions older than this with 0 messages are purged on startup.
pub(crate) const STARTUP_EMPTY_SESSION_MAX_AGE_SECS: i64 = 3600; // 1 hour

// ── Canned user-facing notices ─────────────────────────────────────────────
pub(crate) const REPORT_MODE_NOTICE: &str = "🚧 Report Mode Under Construction";
pub(crate) const UPLINK_FAILED_NOTICE: &str = "⚠️ Uplink Failed. Check server connection.";
pub(crate) const IMAGE_ONLY_PLACEHOLDER: &str = "[User sent an image]";
