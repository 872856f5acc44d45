//! Database module
//!
//! Persists sessions, their scoped state, and conversation messages.

mod schema;

pub use schema::*;

use crate::llm::{ContentBlock, MessageRole, Usage};
use crate::session::KeyScope;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session already exists: {0}")]
    SessionExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ==================== Session Operations ====================

    /// Create a session, seeding it with `initial_state` routed by key prefix
    pub fn create_session(
        &self,
        id: &str,
        app_name: &str,
        user_id: &str,
        initial_state: &Map<String, Value>,
    ) -> DbResult<Session> {
        let now = Utc::now();
        {
            let conn = self.conn.lock().unwrap();
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO sessions (id, app_name, user_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![id, app_name, user_id, now.to_rfc3339()],
            )?;
            if inserted == 0 {
                return Err(DbError::SessionExists(id.to_string()));
            }
        }

        if !initial_state.is_empty() {
            self.apply_state_delta(id, initial_state)?;
        }

        Ok(Session {
            id: id.to_string(),
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Get session by ID
    pub fn get_session(&self, id: &str) -> DbResult<Session> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, app_name, user_id, created_at, updated_at FROM sessions WHERE id = ?1",
            params![id],
            parse_session_row,
        )
        .optional()?
        .ok_or_else(|| DbError::SessionNotFound(id.to_string()))
    }

    /// List a user's sessions, most recently active first
    pub fn list_sessions(&self, app_name: &str, user_id: &str) -> DbResult<Vec<Session>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, app_name, user_id, created_at, updated_at FROM sessions
             WHERE app_name = ?1 AND user_id = ?2
             ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![app_name, user_id], parse_session_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete a session with its messages and session-scoped state
    pub fn delete_session(&self, id: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DbError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }

    // ==================== State Operations ====================

    /// Merged view of app, user, and session state for one session
    pub fn load_state(&self, session_id: &str) -> DbResult<Map<String, Value>> {
        let session = self.get_session(session_id)?;
        let conn = self.conn.lock().unwrap();
        let mut state = Map::new();

        let mut app = conn.prepare("SELECT key, value FROM app_state WHERE app_name = ?1")?;
        read_pairs(app.query_map(params![session.app_name], pair_row)?, &mut state)?;

        let mut user = conn.prepare("SELECT key, value FROM user_state WHERE app_name = ?1 AND user_id = ?2")?;
        read_pairs(
            user.query_map(params![session.app_name, session.user_id], pair_row)?,
            &mut state,
        )?;

        let mut own = conn.prepare("SELECT key, value FROM session_state WHERE session_id = ?1")?;
        read_pairs(own.query_map(params![session_id], pair_row)?, &mut state)?;

        Ok(state)
    }

    /// Persist changed keys in one transaction; `temp:` keys are dropped
    pub fn apply_state_delta(&self, session_id: &str, delta: &Map<String, Value>) -> DbResult<()> {
        let session = self.get_session(session_id)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for (key, value) in delta {
            let encoded = serde_json::to_string(value)?;
            match KeyScope::of(key) {
                KeyScope::App => {
                    tx.execute(
                        "INSERT INTO app_state (app_name, key, value) VALUES (?1, ?2, ?3)
                         ON CONFLICT(app_name, key) DO UPDATE SET value = excluded.value",
                        params![session.app_name, key, encoded],
                    )?;
                }
                KeyScope::User => {
                    tx.execute(
                        "INSERT INTO user_state (app_name, user_id, key, value) VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(app_name, user_id, key) DO UPDATE SET value = excluded.value",
                        params![session.app_name, session.user_id, key, encoded],
                    )?;
                }
                KeyScope::Session => {
                    tx.execute(
                        "INSERT INTO session_state (session_id, key, value) VALUES (?1, ?2, ?3)
                         ON CONFLICT(session_id, key) DO UPDATE SET value = excluded.value",
                        params![session_id, key, encoded],
                    )?;
                }
                KeyScope::Temp => {}
            }
        }

        tx.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), session_id],
        )?;
        tx.commit()?;

        tracing::debug!(session_id = %session_id, keys = delta.len(), "Persisted state delta");
        Ok(())
    }

    // ==================== Message Operations ====================

    /// Append a message to a session
    pub fn add_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &[ContentBlock],
        usage_data: Option<&Usage>,
    ) -> DbResult<Message> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let message_id = uuid::Uuid::new_v4().to_string();

        let sequence_id: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sequence_id), 0) + 1 FROM messages WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;

        let content_str = serde_json::to_string(content)?;
        let usage_str = usage_data.map(serde_json::to_string).transpose()?;

        conn.execute(
            "INSERT INTO messages (message_id, session_id, sequence_id, role, content, usage_data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message_id,
                session_id,
                sequence_id,
                role.as_str(),
                content_str,
                usage_str,
                now.to_rfc3339(),
            ],
        )?;

        conn.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), session_id],
        )?;

        Ok(Message {
            message_id,
            session_id: session_id.to_string(),
            sequence_id,
            role,
            content: content.to_vec(),
            usage_data: usage_data.copied(),
            created_at: now,
        })
    }

    /// Get messages for a session in order
    pub fn get_messages(&self, session_id: &str) -> DbResult<Vec<Message>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT message_id, session_id, sequence_id, role, content, usage_data, created_at
             FROM messages WHERE session_id = ?1 ORDER BY sequence_id ASC",
        )?;

        let rows = stmt.query_map(params![session_id], parse_message_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn parse_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        app_name: row.get(1)?,
        user_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn parse_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get(3)?;
    let content: String = row.get(4)?;
    let usage: Option<String> = row.get(5)?;
    Ok(Message {
        message_id: row.get(0)?,
        session_id: row.get(1)?,
        sequence_id: row.get(2)?,
        role: schema::parse_role(&role),
        content: serde_json::from_str(&content).unwrap_or_default(),
        usage_data: usage.and_then(|u| serde_json::from_str(&u).ok()),
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn pair_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn read_pairs<I>(rows: I, into: &mut Map<String, Value>) -> DbResult<()>
where
    I: Iterator<Item = rusqlite::Result<(String, String)>>,
{
    for row in rows {
        let (key, value) = row?;
        into.insert(key, serde_json::from_str(&value)?);
    }
    Ok(())
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
