use serde::{Deserialize, Serialize};

/// Durable identifier of a user, issued by the account layer.
pub type PlayerId = String;

/// Default upper bound on display name length.
pub const MAX_DISPLAY_NAME_LEN: usize = 32;

/// A participant seated in a game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Check a display name: non-empty after trimming, at most `max_len` bytes,
/// and free of control characters.
pub fn is_valid_display_name(name: &str, max_len: usize) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.len() <= max_len && !trimmed.chars().any(|c| c.is_control())
}
