// Zhenwo Engine — Session Controller
// The thin top-level layer the embedding UI talks to: sign-in, theme and
// mode switching, sending a message, and the history sidebar. Owns the
// AppState record; extracts plain values from it, calls the organisms
// (chat / auth / history), and writes results back.
//
// Locks are never held across an await point.

use crate::atoms::constants::{
    DEFAULT_BASE_URL, IMAGE_ONLY_PLACEHOLDER, REPORT_MODE_NOTICE,
    STARTUP_EMPTY_SESSION_MAX_AGE_SECS, UPLINK_FAILED_NOTICE,
};
use crate::atoms::error::EngineResult;
use crate::atoms::traits::CoachBackend;
use crate::atoms::types::{
    AskRequest, ChatMessage, ChatSession, CoachMode, ImagePayload, ThemeId, UserAccount,
};
use crate::engine::auth::AuthClient;
use crate::engine::chat::{self, CoachClient, TurnOutcome};
use crate::engine::events::{CoachEvent, EventSink};
use crate::engine::history::HistoryStore;
use crate::engine::state::AppState;
use base64::Engine as _;
use log::{error, info, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub struct CoachSession {
    state: AppState,
    store: Arc<HistoryStore>,
    backend: Arc<dyn CoachBackend>,
    auth: AuthClient,
    sink: Arc<dyn EventSink>,
}

impl CoachSession {
    /// Production setup against the hosted backend.
    pub fn new(store: Arc<HistoryStore>, sink: Arc<dyn EventSink>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, store, sink)
    }

    pub fn with_base_url(
        base_url: &str,
        store: Arc<HistoryStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_backend(Arc::new(CoachClient::new(base_url)), base_url, store, sink)
    }

    /// Inject a custom transport (tests script the stream this way).
    pub fn with_backend(
        backend: Arc<dyn CoachBackend>,
        base_url: &str,
        store: Arc<HistoryStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        store
            .cleanup_empty_sessions(STARTUP_EMPTY_SESSION_MAX_AGE_SECS)
            .ok();
        CoachSession {
            state: AppState::new(),
            store,
            backend,
            auth: AuthClient::new(base_url),
            sink,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    // ── Account ────────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> EngineResult<UserAccount> {
        let account = self.auth.login(username, password).await?;
        self.switch_user(account.clone());
        Ok(account)
    }

    pub async fn register(&self, username: &str, password: &str) -> EngineResult<UserAccount> {
        let account = self.auth.register(username, password).await?;
        self.switch_user(account.clone());
        Ok(account)
    }

    pub fn logout(&self) {
        info!("[session] Logging out");
        *self.state.current_user.lock() = None;
        self.state.transcript.lock().clear();
        *self.state.current_session.lock() = None;
    }

    fn switch_user(&self, account: UserAccount) {
        info!("[session] Signed in as {} ({})", account.display_name, account.uid);
        *self.state.current_user.lock() = Some(account);
        self.state.transcript.lock().clear();
        *self.state.current_session.lock() = None;
    }

    fn current_uid(&self) -> String {
        self.state
            .current_user
            .lock()
            .as_ref()
            .map(|u| u.uid.clone())
            .unwrap_or_else(|| UserAccount::guest().uid)
    }

    // ── Preferences ────────────────────────────────────────────────────

    pub fn set_theme(&self, theme: ThemeId) {
        *self.state.theme.lock() = theme;
    }

    pub fn theme(&self) -> ThemeId {
        *self.state.theme.lock()
    }

    pub fn set_mode(&self, mode: CoachMode) {
        *self.state.mode.lock() = mode;
    }

    pub fn mode(&self) -> CoachMode {
        *self.state.mode.lock()
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.state.transcript.lock().clone()
    }

    pub fn paywall_pending(&self) -> bool {
        self.state.paywall_pending.load(Ordering::Relaxed)
    }

    pub fn clear_paywall(&self) {
        self.state.paywall_pending.store(false, Ordering::Relaxed);
    }

    // ── Chat ───────────────────────────────────────────────────────────

    /// Send one user message and stream the assistant's answer into the
    /// transcript. Transport failures become a single terminal notice
    /// message; a paywall frame rolls the assistant message back.
    pub async fn send_message(
        &self,
        text: &str,
        images: Vec<ImagePayload>,
    ) -> EngineResult<()> {
        let images = validate_images(images);
        if text.trim().is_empty() && images.is_empty() {
            return Ok(());
        }

        let mode = self.mode();
        if mode == CoachMode::Report {
            // Not available server-side yet; answer locally.
            self.push_message(ChatMessage::assistant(REPORT_MODE_NOTICE))?;
            return Ok(());
        }

        let user_content = if text.trim().is_empty() {
            IMAGE_ONLY_PLACEHOLDER.to_string()
        } else {
            text.trim().to_string()
        };
        let uid = self.current_uid();

        // History snapshot excludes the question being asked — the
        // backend receives it in the `question` field.
        let history = chat::history_for_wire(&self.state.transcript.lock());

        let mut user_message = ChatMessage::user(user_content.as_str());
        user_message.images = images
            .iter()
            .map(|img| format!("data:{};base64,{}", img.mime, img.base64))
            .collect();
        let session_id = self.ensure_session(&uid, &user_content)?;
        self.push_message(user_message)?;

        let request = AskRequest {
            question: user_content,
            images,
            mode,
            user_id: uid,
            history,
        };

        let guard = self.state.begin_turn();
        let turn_id = uuid::Uuid::new_v4().to_string();

        match chat::run_chat_turn(
            self.backend.as_ref(),
            &request,
            &session_id,
            &turn_id,
            &guard,
            self.sink.as_ref(),
        )
        .await
        {
            Ok(TurnOutcome::Completed(reply)) => {
                if !guard.is_current() {
                    // A newer turn owns the transcript now.
                    return Ok(());
                }
                if !reply.is_empty() {
                    let mut message = ChatMessage::assistant(reply.insight);
                    message.reply_units = reply.reply_units;
                    self.push_message(message)?;
                }
                Ok(())
            }
            Ok(TurnOutcome::Paywalled) => {
                // "This turn never happened": nothing is appended, the UI
                // shows the upgrade prompt instead.
                self.state.paywall_pending.store(true, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                error!("[session] Turn {} failed: {}", turn_id, e);
                self.sink.emit(CoachEvent::Error {
                    turn_id,
                    message: e.to_string(),
                });
                self.push_message(ChatMessage::assistant(UPLINK_FAILED_NOTICE))?;
                Ok(())
            }
        }
    }

    /// Append to the transcript and persist under the current session.
    fn push_message(&self, message: ChatMessage) -> EngineResult<()> {
        if let Some(session_id) = self.state.current_session.lock().clone() {
            self.store.append_message(&session_id, &message)?;
        }
        self.state.transcript.lock().push(message);
        Ok(())
    }

    /// Resolve or create the session row the transcript persists under.
    fn ensure_session(&self, uid: &str, first_message: &str) -> EngineResult<String> {
        let existing = self.state.current_session.lock().clone();
        if let Some(id) = existing {
            return Ok(id);
        }
        let title = chat::derive_session_title(first_message);
        let session = self.store.create_session(uid, &title)?;
        *self.state.current_session.lock() = Some(session.id.clone());
        Ok(session.id)
    }

    // ── History sidebar ────────────────────────────────────────────────

    pub fn list_sessions(&self) -> EngineResult<Vec<ChatSession>> {
        self.store.list_sessions(&self.current_uid())
    }

    /// Start a fresh conversation; the previous one stays archived.
    pub fn new_chat(&self) {
        self.state.transcript.lock().clear();
        *self.state.current_session.lock() = None;
    }

    pub fn load_session(&self, session_id: &str) -> EngineResult<()> {
        let messages = self.store.session_messages(session_id)?;
        *self.state.transcript.lock() = messages;
        *self.state.current_session.lock() = Some(session_id.to_string());
        Ok(())
    }

    pub fn delete_session(&self, session_id: &str) -> EngineResult<()> {
        self.store.delete_session(session_id)?;
        let mut current = self.state.current_session.lock();
        if current.as_deref() == Some(session_id) {
            *current = None;
            drop(current);
            self.state.transcript.lock().clear();
        }
        Ok(())
    }
}

/// Drop attachments whose base64 payload does not decode — the backend
/// would reject the whole request otherwise.
fn validate_images(images: Vec<ImagePayload>) -> Vec<ImagePayload> {
    images
        .into_iter()
        .filter(|img| {
            match base64::engine::general_purpose::STANDARD.decode(&img.base64) {
                Ok(_) => true,
                Err(e) => {
                    warn!("[session] Dropping undecodable {} attachment: {}", img.mime, e);
                    false
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::EngineResult;
    use crate::atoms::traits::ChunkStream;
    use crate::engine::events::NullSink;
    use async_trait::async_trait;
    use futures::StreamExt;

    struct ScriptedBackend(Vec<String>);

    #[async_trait]
    impl CoachBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn ask_stream(&self, _request: &AskRequest) -> EngineResult<ChunkStream> {
            let chunks = self.0.clone();
            Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
        }
    }

    fn session_with(chunks: Vec<String>) -> CoachSession {
        CoachSession::with_backend(
            Arc::new(ScriptedBackend(chunks)),
            "http://localhost:0",
            Arc::new(HistoryStore::open_in_memory().unwrap()),
            Arc::new(NullSink),
        )
    }

    #[tokio::test]
    async fn empty_input_is_a_noop() {
        let session = session_with(vec![]);
        session.send_message("   ", vec![]).await.unwrap();
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn report_mode_short_circuits() {
        let session = session_with(vec![]);
        session.set_mode(CoachMode::Report);
        session.send_message("write my report", vec![]).await.unwrap();

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, REPORT_MODE_NOTICE);
    }

    #[tokio::test]
    async fn bad_base64_attachments_are_dropped() {
        let session = session_with(vec![
            "data: {\"type\":\"analysis\",\"content\":\"ok\"}\n\ndata: [DONE]\n\n".into(),
        ]);
        session
            .send_message(
                "look at this",
                vec![
                    ImagePayload {
                        base64: "not base64!!".into(),
                        mime: "image/png".into(),
                    },
                    ImagePayload {
                        base64: "aGk=".into(),
                        mime: "image/png".into(),
                    },
                ],
            )
            .await
            .unwrap();

        let transcript = session.transcript();
        // Only the valid attachment survived on the user message.
        assert_eq!(transcript[0].images.len(), 1);
    }

    #[tokio::test]
    async fn theme_and_mode_are_plain_state() {
        let session = session_with(vec![]);
        session.set_theme(ThemeId::Matcha);
        session.set_mode(CoachMode::Quick);
        assert_eq!(session.theme(), ThemeId::Matcha);
        assert_eq!(session.mode(), CoachMode::Quick);
    }
}
