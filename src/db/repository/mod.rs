pub mod app_state;
pub mod conversation;

pub use app_state::*;
pub use conversation::*;

/// Timestamp storage format. Millisecond precision so `updated_at` bumps
/// within the same second remain observable.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
