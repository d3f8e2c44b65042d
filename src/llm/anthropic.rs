//! Upstream provider contract — the Anthropic Messages API.
//!
//! The relay forwards chat requests here; nothing else in the crate talks
//! to the provider directly. Request/response wire types only — the SSE
//! response body is handled by `llm::sse`.

use serde::{Deserialize, Serialize};

/// Upstream API base URL (the relay appends `/v1/messages`).
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// Protocol version header value required by the Messages API.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Fixed generation cap for every request.
pub const MAX_TOKENS: u32 = 8096;

/// Model used when a request doesn't name one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// A model the picker UI can offer.
#[derive(Debug, Clone, Serialize)]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
}

/// Models available to new conversations. The first entry is the default.
pub const MODEL_OPTIONS: &[ModelOption] = &[
    ModelOption {
        id: "claude-sonnet-4-5-20250929",
        name: "Claude Sonnet 4.5",
    },
    ModelOption {
        id: "claude-opus-4-6",
        name: "Claude Opus 4.6",
    },
    ModelOption {
        id: "claude-haiku-4-5-20251001",
        name: "Claude Haiku 4.5",
    },
];

/// One `{role, content}` pair as it travels relay → provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Request body for POST /v1/messages (always streaming).
#[derive(Serialize)]
pub struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub stream: bool,
    pub messages: &'a [WireMessage],
}

impl<'a> MessagesRequest<'a> {
    pub fn streaming(model: &'a str, messages: &'a [WireMessage]) -> Self {
        Self {
            model,
            max_tokens: MAX_TOKENS,
            stream: true,
            messages,
        }
    }
}
