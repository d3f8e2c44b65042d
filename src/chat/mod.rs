//! Chat interface — title generation, sidebar summaries, and the
//! orchestrator that drives a message through the streaming pipeline.

pub mod orchestrator;

pub use orchestrator::{ChatError, ChatOrchestrator};

use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;
use crate::models::DEFAULT_CONVERSATION_TITLE;
use crate::store::ChatStore;

/// Characters of the first user message kept as the conversation title.
const TITLE_MAX_CHARS: usize = 50;

/// Characters of the last message shown in the sidebar preview.
const PREVIEW_MAX_CHARS: usize = 80;

/// Generate a conversation title from the first user message.
/// Truncates at 50 characters with "..." if longer.
pub fn generate_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return DEFAULT_CONVERSATION_TITLE.to_string();
    }

    let mut title: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

/// Conversation summary for the sidebar list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub model: String,
    pub updated_at: String,
    pub message_count: u32,
    pub last_message_preview: String,
}

/// Summaries of all conversations, newest first.
pub fn list_conversation_summaries(
    store: &ChatStore,
) -> Result<Vec<ConversationSummary>, DatabaseError> {
    let summaries = store
        .conversations()?
        .into_iter()
        .map(|conv| {
            let preview = conv
                .messages
                .last()
                .map(|m| m.content.chars().take(PREVIEW_MAX_CHARS).collect())
                .unwrap_or_default();
            ConversationSummary {
                id: conv.id.to_string(),
                title: conv.title,
                model: conv.model,
                updated_at: conv.updated_at.to_string(),
                message_count: conv.messages.len() as u32,
                last_message_preview: preview,
            }
        })
        .collect();
    Ok(summaries)
}
