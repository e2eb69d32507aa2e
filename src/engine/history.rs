// Zhenwo Engine — Local History Store
// Per-user conversation archive in SQLite via rusqlite. The engine owns
// its own connection; the embedding UI reads through the controller.

use crate::atoms::constants::HISTORY_LIST_LIMIT;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{ChatMessage, ChatSession, Role};
use log::info;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::PathBuf;

/// Path to the history database under the platform data dir.
pub fn history_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zhenwo")
        .join("history.db")
}

/// Thread-safe database wrapper.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Open (or create) the history database and initialize tables.
    pub fn open() -> EngineResult<Self> {
        let path = history_db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("[history] Opening history store at {:?}", path);

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        run_migrations(&conn)?;

        Ok(HistoryStore {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(HistoryStore {
            conn: Mutex::new(conn),
        })
    }

    // ── Session CRUD ───────────────────────────────────────────────────

    pub fn create_session(&self, user_id: &str, title: &str) -> EngineResult<ChatSession> {
        let conn = self.conn.lock();
        let id = format!("chat-{}", uuid::Uuid::new_v4());

        conn.execute(
            "INSERT INTO sessions (id, user_id, title) VALUES (?1, ?2, ?3)",
            params![id, user_id, title],
        )?;

        let now = chrono::Utc::now().to_rfc3339();
        Ok(ChatSession {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now.clone(),
            updated_at: now,
            message_count: 0,
        })
    }

    /// Most-recent sessions for one user, for the archive sidebar.
    pub fn list_sessions(&self, user_id: &str) -> EngineResult<Vec<ChatSession>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, created_at, updated_at, message_count \
             FROM sessions WHERE user_id = ?1 ORDER BY updated_at DESC LIMIT ?2",
        )?;

        let sessions = stmt
            .query_map(params![user_id, HISTORY_LIST_LIMIT], |row| {
                Ok(ChatSession {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    title: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    message_count: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(sessions)
    }

    pub fn delete_session(&self, id: &str) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM messages WHERE session_id = ?1", params![id])?;
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ── Messages ───────────────────────────────────────────────────────

    pub fn append_message(&self, session_id: &str, message: &ChatMessage) -> EngineResult<()> {
        let conn = self.conn.lock();
        let id = uuid::Uuid::new_v4().to_string();
        let units_json = if message.reply_units.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&message.reply_units)?)
        };
        let images_json = if message.images.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&message.images)?)
        };

        conn.execute(
            "INSERT INTO messages (id, session_id, role, content, units_json, images_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                session_id,
                message.role.as_str(),
                message.content,
                units_json,
                images_json
            ],
        )?;
        conn.execute(
            "UPDATE sessions SET message_count = message_count + 1, \
             updated_at = datetime('now') WHERE id = ?1",
            params![session_id],
        )?;
        Ok(())
    }

    /// Full transcript of one session, oldest first.
    pub fn session_messages(&self, session_id: &str) -> EngineResult<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT role, content, units_json, images_json \
             FROM messages WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;

        let messages = stmt
            .query_map(params![session_id], |row| {
                let role: String = row.get(0)?;
                let content: String = row.get(1)?;
                let units_json: Option<String> = row.get(2)?;
                let images_json: Option<String> = row.get(3)?;
                Ok(ChatMessage {
                    role: Role::parse(&role),
                    content,
                    reply_units: units_json
                        .and_then(|j| serde_json::from_str(&j).ok())
                        .unwrap_or_default(),
                    images: images_json
                        .and_then(|j| serde_json::from_str(&j).ok())
                        .unwrap_or_default(),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(messages)
    }

    // ── Housekeeping ───────────────────────────────────────────────────

    /// Bulk-delete sessions with 0 messages older than `max_age_secs`.
    /// Returns the number of sessions deleted.
    pub fn cleanup_empty_sessions(&self, max_age_secs: i64) -> EngineResult<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE message_count = 0 \
             AND updated_at < datetime('now', ?1)",
            params![format!("-{} seconds", max_age_secs)],
        )?;

        if deleted > 0 {
            info!(
                "[history] Cleaned up {} empty session(s) older than {}s",
                deleted, max_age_secs
            );
        }
        Ok(deleted)
    }
}

// ── Schema ─────────────────────────────────────────────────────────────
// Adding a table or column: append an idempotent CREATE TABLE IF NOT
// EXISTS / ALTER TABLE … ADD COLUMN at the end — never modify existing
// SQL, to keep upgrade paths clean.

fn run_migrations(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            message_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user
            ON sessions(user_id, updated_at DESC);

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            units_json TEXT,
            images_json TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session
            ON messages(session_id, created_at);
    ",
    )?;
    Ok(())
}
