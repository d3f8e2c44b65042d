//! Chat orchestrator — the stateful coordinator of the streaming pipeline.
//!
//! Owns the send lifecycle: append the user message, create the assistant
//! placeholder, call the relay, apply streamed tokens to the store, and
//! settle the stream's end state. The store stays the single source of
//! truth throughout — the orchestrator only ever writes through it, and the
//! decoder below never learns which conversation it is feeding.
//!
//! One stream at a time, system-wide: the store's streaming flag gates
//! `send_message`, and cancellation is a cooperative signal the decode loop
//! observes at its next read.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::relay::RelayRequest;
use crate::chat::generate_title;
use crate::credentials::ApiKeyStore;
use crate::db::DatabaseError;
use crate::llm::anthropic::{WireMessage, DEFAULT_MODEL};
use crate::llm::sse::{self, StreamOutcome};
use crate::models::MessageRole;
use crate::store::ChatStore;

/// Rejections surfaced before any message is appended or request sent.
/// Stream-level failures are not errors here — they end up as
/// [`StreamOutcome::Failed`] and as `Error:`-prefixed assistant text.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("A response is already streaming")]
    StreamInFlight,

    #[error("No API key configured")]
    MissingApiKey,

    #[error("Nothing to retry")]
    NothingToRetry,

    #[error("Conversation no longer exists")]
    ConversationGone,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct ChatOrchestrator {
    store: Arc<ChatStore>,
    credentials: Arc<ApiKeyStore>,
    http: reqwest::Client,
    chat_url: String,
    selected_model: Mutex<String>,
    cancel_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl ChatOrchestrator {
    /// `chat_url` is the relay's chat endpoint (see `RelayServer::chat_url`).
    pub fn new(store: Arc<ChatStore>, credentials: Arc<ApiKeyStore>, chat_url: String) -> Self {
        Self {
            store,
            credentials,
            http: reqwest::Client::new(),
            chat_url,
            selected_model: Mutex::new(DEFAULT_MODEL.to_string()),
            cancel_tx: Mutex::new(None),
        }
    }

    /// Model used for conversations created from now on. Existing
    /// conversations keep the model they were created with.
    pub fn set_selected_model(&self, model: &str) {
        *self
            .selected_model
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = model.to_string();
    }

    pub fn selected_model(&self) -> String {
        self.selected_model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send a user message and drive the assistant's streamed reply to its
    /// end state. Returns how the stream settled; pre-flight rejections
    /// leave the store untouched.
    pub async fn send_message(&self, text: &str) -> Result<StreamOutcome, ChatError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.store.is_streaming() {
            return Err(ChatError::StreamInFlight);
        }
        // Configuration error — surfaced before any network contact so the
        // UI can prompt for the key instead of sending
        let api_key = self.credentials.api_key().ok_or(ChatError::MissingApiKey)?;

        // 1. Conversation: reuse the active one or lazily create it
        let conversation_id = match self.store.active_conversation_id()? {
            Some(id) => id,
            None => self.store.create_conversation(&self.selected_model())?,
        };

        // 2. Append the user message
        self.store
            .append_message(conversation_id, MessageRole::User, trimmed)?
            .ok_or(ChatError::ConversationGone)?;

        // 3. First message names the conversation
        if self.store.message_count(conversation_id)? == 1 {
            self.store
                .rename_conversation(conversation_id, &generate_title(trimmed))?;
        }

        // 4. Snapshot the history for the relay — everything except the
        //    placeholder created next
        let conversation = self
            .store
            .get_conversation(conversation_id)?
            .ok_or(ChatError::ConversationGone)?;
        let history: Vec<WireMessage> = conversation
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();
        let model = conversation.model;

        // 5. Empty assistant placeholder for tokens to land in
        let assistant_id = self
            .store
            .append_message(conversation_id, MessageRole::Assistant, "")?
            .ok_or(ChatError::ConversationGone)?;

        self.store.set_streaming(true);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        *self
            .cancel_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel_tx);

        let request = RelayRequest {
            messages: history,
            model: Some(model),
            api_key,
        };

        let outcome = match self.http.post(&self.chat_url).json(&request).send().await {
            Ok(response) => {
                sse::decode_response(response, cancel_rx, |token| {
                    self.apply_token(conversation_id, assistant_id, token);
                })
                .await
            }
            // Transport failure surfaces exactly like a stream failure
            Err(e) => StreamOutcome::Failed(e.to_string()),
        };

        match &outcome {
            StreamOutcome::Completed(full_text) => {
                tracing::debug!(
                    %conversation_id,
                    chars = full_text.len(),
                    "Stream completed"
                );
                self.release_stream();
            }
            StreamOutcome::Failed(reason) => {
                tracing::warn!(%conversation_id, %reason, "Stream failed");
                let _ = self.store.update_message_content(
                    conversation_id,
                    assistant_id,
                    &format!("Error: {reason}"),
                );
                self.release_stream();
            }
            // stop_streaming already released; the content freezes as-is
            StreamOutcome::Cancelled => {}
        }

        Ok(outcome)
    }

    /// Append one streamed token to the placeholder. Reads the current
    /// content back first, so a concurrent mutation is tolerated; a deleted
    /// conversation or message makes the whole write a silent no-op.
    fn apply_token(&self, conversation_id: Uuid, message_id: Uuid, token: &str) {
        let current = self
            .store
            .message_content(conversation_id, message_id)
            .ok()
            .flatten()
            .unwrap_or_default();
        let _ = self
            .store
            .update_message_content(conversation_id, message_id, &format!("{current}{token}"));
    }

    /// Cancel the in-flight stream, if any, and clear the streaming flag
    /// immediately — without waiting for the decoder to notice.
    pub fn stop_streaming(&self) {
        if let Some(tx) = self
            .cancel_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = tx.send(());
        }
        self.store.set_streaming(false);
    }

    /// Clear the active selection; the next send lazily creates a fresh
    /// conversation. Deletes nothing.
    pub fn start_new_chat(&self) -> Result<(), ChatError> {
        self.store.set_active(None)?;
        Ok(())
    }

    /// Re-send the most recent user message as a brand-new exchange (a new
    /// user+assistant pair; nothing is edited or replaced).
    pub async fn retry(&self) -> Result<StreamOutcome, ChatError> {
        if self.store.is_streaming() {
            return Err(ChatError::StreamInFlight);
        }
        let conversation = self
            .store
            .active_conversation_id()?
            .and_then(|id| self.store.get_conversation(id).transpose())
            .transpose()?
            .ok_or(ChatError::NothingToRetry)?;

        if conversation.messages.len() < 2 {
            return Err(ChatError::NothingToRetry);
        }

        let text = conversation
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .ok_or(ChatError::NothingToRetry)?;

        self.send_message(&text).await
    }

    /// Clear the cancel slot, then the flag. In that order: new sends are
    /// gated on the flag, so the slot is never cleared out from under a
    /// newer stream.
    fn release_stream(&self) {
        *self
            .cancel_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.store.set_streaming(false);
    }
}
