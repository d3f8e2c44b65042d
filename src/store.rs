//! Persistent conversation store — the single source of truth for chats.
//!
//! `ChatStore` is an injectable state container over a SQLite database.
//! Every mutating operation persists inside a transaction before returning,
//! so a reader never observes a half-applied conversation list and a process
//! restart reloads exactly what the last mutation committed.
//!
//! The one piece of transient state is the global streaming flag: it lives
//! in memory only and is always false after a reload.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, repository, DatabaseError};
use crate::models::{Conversation, Message, MessageRole};

pub struct ChatStore {
    conn: Mutex<Connection>,
    streaming: AtomicBool,
}

impl ChatStore {
    /// Open (or create) the store at `path`, running migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    /// In-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            streaming: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Conversations ───────────────────────────────────────

    /// Create a conversation bound to `model`, insert it at the head of the
    /// list, and mark it active. Returns its id.
    pub fn create_conversation(&self, model: &str) -> Result<Uuid, DatabaseError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let conv = Conversation::new(model);
        repository::insert_conversation(&tx, &conv)?;
        repository::set_active_conversation_id(&tx, Some(conv.id))?;
        tx.commit()?;
        Ok(conv.id)
    }

    /// Delete a conversation and its messages. Idempotent — absent ids are
    /// a no-op. If it was active, the selection clears to null.
    pub fn delete_conversation(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        if repository::delete_conversation(&tx, id)?
            && repository::get_active_conversation_id(&tx)? == Some(id)
        {
            repository::set_active_conversation_id(&tx, None)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn set_active(&self, id: Option<Uuid>) -> Result<(), DatabaseError> {
        repository::set_active_conversation_id(&self.lock(), id)
    }

    pub fn active_conversation_id(&self) -> Result<Option<Uuid>, DatabaseError> {
        repository::get_active_conversation_id(&self.lock())
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, DatabaseError> {
        repository::get_conversation(&self.lock(), id)
    }

    /// Full snapshot, newest conversation first.
    pub fn conversations(&self) -> Result<Vec<Conversation>, DatabaseError> {
        repository::list_conversations(&self.lock())
    }

    pub fn rename_conversation(&self, id: Uuid, title: &str) -> Result<(), DatabaseError> {
        repository::update_title(&self.lock(), id, title)
    }

    // ── Messages ────────────────────────────────────────────

    /// Append a message and bump the conversation's `updated_at`.
    /// Silent no-op (returns None) when the conversation is absent.
    pub fn append_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<Option<Uuid>, DatabaseError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        if !repository::conversation_exists(&tx, conversation_id)? {
            return Ok(None);
        }
        let msg = Message::new(conversation_id, role, content);
        repository::insert_message(&tx, &msg)?;
        repository::touch_conversation(&tx, conversation_id)?;
        tx.commit()?;
        Ok(Some(msg.id))
    }

    /// Replace a message's content in place and bump `updated_at`.
    /// Silent no-op when either id is absent (a token arriving for a
    /// conversation deleted mid-stream lands here).
    pub fn update_message_content(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        content: &str,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        if repository::update_message_content(&tx, conversation_id, message_id, content)? {
            repository::touch_conversation(&tx, conversation_id)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn message_content(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<Option<String>, DatabaseError> {
        repository::get_message_content(&self.lock(), conversation_id, message_id)
    }

    pub fn message_count(&self, conversation_id: Uuid) -> Result<u32, DatabaseError> {
        repository::count_messages(&self.lock(), conversation_id)
    }

    // ── Streaming flag ──────────────────────────────────────

    /// Global streaming flag. Transient — never persisted.
    pub fn set_streaming(&self, streaming: bool) {
        self.streaming.store(streaming, Ordering::SeqCst);
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }
}
