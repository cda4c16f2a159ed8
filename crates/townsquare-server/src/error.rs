use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use townsquare_core::envelope::Envelope;
use townsquare_core::game_trait::GameError;

use crate::friends::FriendError;
use crate::session_registry::SessionError;
use crate::store::StoreError;

/// Message shown to clients for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Error returned by API handlers. Rendered as a failed envelope.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Forbidden(String),
    /// Join, turn, or phase conflicts.
    Conflict(String),
    Unavailable(String),
    /// The request outlived `request_timeout_secs`.
    Timeout,
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(m)
            | Self::NotFound(m)
            | Self::Forbidden(m)
            | Self::Conflict(m)
            | Self::Unavailable(m)
            | Self::Internal(m) => write!(f, "{m}"),
            Self::Timeout => write!(f, "request timed out"),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                INTERNAL_ERROR_MESSAGE.to_string()
            },
            other => other.to_string(),
        };
        (status, Json(Envelope::<()>::failure(message))).into_response()
    }
}

impl From<GameError> for AppError {
    fn from(e: GameError) -> Self {
        match e {
            GameError::AlreadyFull
            | GameError::SelfJoin
            | GameError::GameNotActive
            | GameError::NotYourTurn => Self::Conflict(e.to_string()),
            GameError::IllegalMove(_) | GameError::InvalidSeed(_) => {
                Self::Validation(e.to_string())
            },
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Game(inner) => inner.into(),
            SessionError::NotFound(_) => Self::NotFound(e.to_string()),
            SessionError::Forbidden(m) => Self::Forbidden(m),
            SessionError::VariantUnavailable(_) => Self::Validation(e.to_string()),
            SessionError::CapacityReached(_) => Self::Unavailable(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<FriendError> for AppError {
    fn from(e: FriendError) -> Self {
        match e {
            FriendError::Validation(m) => Self::Validation(m),
            FriendError::NotFound(m) => Self::NotFound(m),
            FriendError::Store(inner) => inner.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Replace the bare 408 emitted by the timeout layer with a failed envelope.
pub async fn envelope_timeout(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return AppError::Timeout.into_response();
    }
    response
}
