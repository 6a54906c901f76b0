pub mod format;
pub mod intent;
pub mod models;
pub mod moderation;
pub mod replies;

pub use format::{format_reply, format_reply_with, FormatOptions};
pub use intent::{classify_intent, normalize_text};
pub use models::*;
pub use moderation::{ModerationGate, ModerationPolicy, ModerationVerdict};
