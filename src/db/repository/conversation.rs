use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::TS_FORMAT;
use crate::db::DatabaseError;
use crate::models::enums::MessageRole;
use crate::models::{Conversation, Message};

pub fn insert_conversation(conn: &Connection, conv: &Conversation) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO conversations (id, title, model, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            conv.id.to_string(),
            conv.title,
            conv.model,
            conv.created_at.format(TS_FORMAT).to_string(),
            conv.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn conversation_exists(conn: &Connection, id: Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM conversations WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_conversation(
    conn: &Connection,
    id: Uuid,
) -> Result<Option<Conversation>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, title, model, created_at, updated_at FROM conversations WHERE id = ?1",
        params![id.to_string()],
        conversation_from_row,
    );

    match result {
        Ok(row) => {
            let mut conv = conversation_from_parts(row)?;
            conv.messages = get_messages(conn, conv.id)?;
            Ok(Some(conv))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All conversations, newest first (insertion order — the list is never
/// re-sorted on update), each with its full message sequence.
pub fn list_conversations(conn: &Connection) -> Result<Vec<Conversation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, model, created_at, updated_at
         FROM conversations ORDER BY rowid DESC",
    )?;
    let rows = stmt.query_map([], conversation_from_row)?;

    let mut conversations = Vec::new();
    for row in rows {
        let mut conv = conversation_from_parts(row?)?;
        conv.messages = get_messages(conn, conv.id)?;
        conversations.push(conv);
    }
    Ok(conversations)
}

/// Delete a conversation (messages cascade). Returns false if absent.
pub fn delete_conversation(conn: &Connection, id: Uuid) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "DELETE FROM conversations WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(rows > 0)
}

pub fn update_title(conn: &Connection, id: Uuid, title: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE conversations SET title = ?2 WHERE id = ?1",
        params![id.to_string(), title],
    )?;
    Ok(())
}

/// Bump a conversation's `updated_at` to now.
pub fn touch_conversation(conn: &Connection, id: Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
        params![
            id.to_string(),
            Utc::now().naive_utc().format(TS_FORMAT).to_string()
        ],
    )?;
    Ok(())
}

pub fn insert_message(conn: &Connection, msg: &Message) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO messages (id, conversation_id, role, content, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            msg.id.to_string(),
            msg.conversation_id.to_string(),
            msg.role.as_str(),
            msg.content,
            msg.timestamp.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Messages of a conversation in insertion order.
pub fn get_messages(conn: &Connection, conversation_id: Uuid) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, role, content, timestamp
         FROM messages WHERE conversation_id = ?1 ORDER BY rowid ASC",
    )?;

    let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
        Ok(MessageRow {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            timestamp: row.get(4)?,
        })
    })?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(message_from_row(row?)?);
    }
    Ok(messages)
}

pub fn count_messages(conn: &Connection, conversation_id: Uuid) -> Result<u32, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
        params![conversation_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Replace a message's content in place. Returns false when either id is
/// absent (the caller treats that as a no-op).
pub fn update_message_content(
    conn: &Connection,
    conversation_id: Uuid,
    message_id: Uuid,
    content: &str,
) -> Result<bool, DatabaseError> {
    let rows = conn.execute(
        "UPDATE messages SET content = ?3 WHERE id = ?2 AND conversation_id = ?1",
        params![
            conversation_id.to_string(),
            message_id.to_string(),
            content
        ],
    )?;
    Ok(rows > 0)
}

pub fn get_message_content(
    conn: &Connection,
    conversation_id: Uuid,
    message_id: Uuid,
) -> Result<Option<String>, DatabaseError> {
    let result = conn.query_row(
        "SELECT content FROM messages WHERE id = ?2 AND conversation_id = ?1",
        params![conversation_id.to_string(), message_id.to_string()],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(content) => Ok(Some(content)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

struct ConversationRow {
    id: String,
    title: String,
    model: String,
    created_at: String,
    updated_at: String,
}

struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    timestamp: String,
}

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        title: row.get(1)?,
        model: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn conversation_from_parts(row: ConversationRow) -> Result<Conversation, DatabaseError> {
    Ok(Conversation {
        id: parse_uuid(&row.id, "conversation")?,
        title: row.title,
        model: row.model,
        messages: Vec::new(),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

fn message_from_row(row: MessageRow) -> Result<Message, DatabaseError> {
    Ok(Message {
        id: parse_uuid(&row.id, "message")?,
        conversation_id: parse_uuid(&row.conversation_id, "conversation")?,
        role: MessageRole::from_str(&row.role)?,
        content: row.content,
        timestamp: parse_timestamp(&row.timestamp),
    })
}

fn parse_uuid(s: &str, entity_type: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|_| DatabaseError::NotFound {
        entity_type: entity_type.into(),
        id: s.into(),
    })
}

fn parse_timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_default()
}
