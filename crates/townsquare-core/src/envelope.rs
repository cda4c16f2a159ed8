use serde::{Deserialize, Serialize};

/// Uniform response wrapper for every session and friend operation.
///
/// A failed envelope always carries `message` and never `response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = ()> {
    #[serde(rename = "isOK")]
    pub is_ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(response: T) -> Self {
        Self {
            is_ok: true,
            response: Some(response),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_ok: false,
            response: None,
            message: Some(message.into()),
        }
    }
}

impl Envelope<()> {
    /// Success with no payload.
    pub fn empty() -> Self {
        Self {
            is_ok: true,
            response: None,
            message: None,
        }
    }
}
