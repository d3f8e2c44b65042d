use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MessageRole;

/// Title given to a conversation before its first user message renames it.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New chat";

/// A conversation with the assistant. `model` is bound at creation and never
/// changes, even when the globally selected model does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub model: String,
}

impl Conversation {
    /// A fresh, empty conversation bound to `model`.
    pub fn new(model: &str) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            model: model.to_string(),
        }
    }
}

/// A single message. Role and timestamp are fixed at creation; content is
/// written once for user messages and grows by append for the assistant
/// message currently being streamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: NaiveDateTime,
}

impl Message {
    pub fn new(conversation_id: Uuid, role: MessageRole, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.to_string(),
            timestamp: Utc::now().naive_utc(),
        }
    }
}
