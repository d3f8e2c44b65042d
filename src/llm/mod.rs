pub mod anthropic;
pub mod sse;

pub use anthropic::{ModelOption, WireMessage, DEFAULT_MODEL, MODEL_OPTIONS};
pub use sse::StreamOutcome;
