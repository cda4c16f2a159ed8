use std::future::Future;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::Value;

use townsquare_core::envelope::Envelope;
use townsquare_core::net::messages::{
    GameDeletedMsg, GameInviteMsg, GameUpdatedMsg, ServerMessage,
};
use townsquare_core::player::{Player, is_valid_display_name};
use townsquare_core::session::{GameVariant, Phase, SessionSummary};

use crate::error::AppError;
use crate::friends::{FriendOverview, FriendRequestStatus};
use crate::state::AppState;
use crate::store::UserProfile;

/// Longest accepted user, town, or session identifier.
const MAX_ID_LEN: usize = 128;

type ApiResult<T> = Result<Json<Envelope<T>>, AppError>;

fn validate_id(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    if value.trim() != value {
        return Err(AppError::Validation(format!(
            "{field} must not have surrounding whitespace"
        )));
    }
    if value.len() > MAX_ID_LEN {
        return Err(AppError::Validation(format!(
            "{field} exceeds {MAX_ID_LEN} chars"
        )));
    }
    Ok(())
}

/// Run `work` on its own task and wait for it. Once spawned it runs to
/// completion even if the request future is dropped by the timeout layer or a
/// client disconnect, so a mutation and the notifications that follow it are
/// never cut off partway.
async fn run_detached<T, F>(work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| AppError::Internal(format!("request task failed: {e}")))?
}

/// Use the supplied display name, or fall back to the stored profile when it
/// is blank.
async fn resolve_display_name(
    state: &AppState,
    user_id: &str,
    name: &str,
) -> Result<String, AppError> {
    let max_len = state.config.limits.max_name_len;
    if !name.trim().is_empty() {
        if !is_valid_display_name(name, max_len) {
            return Err(AppError::Validation(format!(
                "display name must be 1-{max_len} chars without control characters"
            )));
        }
        return Ok(name.trim().to_string());
    }
    match state.store.get_user(user_id).await? {
        Some(profile) => Ok(profile.display_name),
        None => Err(AppError::Validation(format!(
            "no display name given and no profile for {user_id}"
        ))),
    }
}

async fn notify_updated(state: &AppState, user_id: &str, summary: &SessionSummary) {
    let msg = ServerMessage::GameUpdated(Box::new(GameUpdatedMsg {
        summary: summary.clone(),
    }));
    state.presence.notify(user_id, &msg).await;
}

/// Request body for creating a game session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameBody {
    pub town_id: String,
    pub variant: GameVariant,
    pub player1_id: String,
    #[serde(default)]
    pub player1_name: String,
    #[serde(default)]
    pub seed: Option<Value>,
}

/// POST /api/v1/games
pub async fn create_game(
    State(state): State<AppState>,
    body: Result<Json<CreateGameBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<SessionSummary>>), AppError> {
    let Json(body) = body?;
    validate_id("townId", &body.town_id)?;
    validate_id("player1Id", &body.player1_id)?;
    let name = resolve_display_name(&state, &body.player1_id, &body.player1_name).await?;

    let summary = state
        .sessions
        .create_session(
            &body.town_id,
            body.variant,
            Player::new(body.player1_id, name),
            body.seed.as_ref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(summary))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGamesQuery {
    pub town_id: Option<String>,
}

/// GET /api/v1/games?townId=
pub async fn list_games(
    State(state): State<AppState>,
    query: Result<Query<ListGamesQuery>, QueryRejection>,
) -> ApiResult<Vec<SessionSummary>> {
    let Query(query) = query?;
    let sessions = state.sessions.list_sessions(query.town_id.as_deref()).await;
    Ok(Json(Envelope::ok(sessions)))
}

/// GET /api/v1/games/{id}
pub async fn get_game(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<SessionSummary> {
    let Path(session_id) = path?;
    let summary = state.sessions.get_session(&session_id).await?;
    Ok(Json(Envelope::ok(summary)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameBody {
    pub player2_id: String,
    #[serde(default)]
    pub player2_name: String,
}

/// POST /api/v1/games/{id}/join
pub async fn join_game(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<JoinGameBody>, JsonRejection>,
) -> ApiResult<SessionSummary> {
    let Path(session_id) = path?;
    let Json(body) = body?;
    validate_id("player2Id", &body.player2_id)?;
    let name = resolve_display_name(&state, &body.player2_id, &body.player2_name).await?;

    let summary = run_detached(async move {
        let summary = state
            .sessions
            .join_session(&session_id, Player::new(body.player2_id, name))
            .await?;
        notify_updated(&state, &summary.player1_id, &summary).await;
        Ok::<_, AppError>(summary)
    })
    .await?;
    Ok(Json(Envelope::ok(summary)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBody {
    pub acting_player_id: String,
    #[serde(default)]
    pub move_data: Value,
}

/// POST /api/v1/games/{id}/moves
pub async fn apply_move(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<MoveBody>, JsonRejection>,
) -> ApiResult<SessionSummary> {
    let Path(session_id) = path?;
    let Json(body) = body?;
    validate_id("actingPlayerId", &body.acting_player_id)?;

    let summary = run_detached(async move {
        let result = state
            .sessions
            .apply_move(&session_id, &body.acting_player_id, &body.move_data)
            .await?;
        if let Some(opponent) = result.summary.opponent_of(&body.acting_player_id) {
            notify_updated(&state, opponent, &result.summary).await;
        }
        Ok::<_, AppError>(result.summary)
    })
    .await?;
    Ok(Json(Envelope::ok(summary)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteGameQuery {
    pub requester_id: String,
}

/// DELETE /api/v1/games/{id}?requesterId=
pub async fn delete_game(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<DeleteGameQuery>, QueryRejection>,
) -> ApiResult<()> {
    let Path(session_id) = path?;
    let Query(query) = query?;
    validate_id("requesterId", &query.requester_id)?;

    run_detached(async move {
        let summary = state
            .sessions
            .delete_session(&session_id, &query.requester_id)
            .await?;
        if let Some(opponent) = summary.opponent_of(&query.requester_id) {
            let msg = ServerMessage::GameDeleted(GameDeletedMsg {
                session_id: summary.session_id.clone(),
                by_user_id: query.requester_id.clone(),
            });
            state.presence.notify(opponent, &msg).await;
        }
        Ok::<_, AppError>(())
    })
    .await?;
    Ok(Json(Envelope::empty()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteBody {
    pub from_user_id: String,
    pub to_user_id: String,
}

/// POST /api/v1/games/{id}/invite
pub async fn invite_to_game(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<InviteBody>, JsonRejection>,
) -> ApiResult<()> {
    let Path(session_id) = path?;
    let Json(body) = body?;
    validate_id("fromUserId", &body.from_user_id)?;
    validate_id("toUserId", &body.to_user_id)?;
    if body.from_user_id == body.to_user_id {
        return Err(AppError::Validation("cannot invite yourself".to_string()));
    }

    let summary = state.sessions.get_session(&session_id).await?;
    if !summary.is_participant(&body.from_user_id) {
        return Err(AppError::Forbidden(
            "only participants can invite to a game".to_string(),
        ));
    }
    if summary.phase != Phase::WaitingForPlayer2 {
        return Err(AppError::Conflict(
            "game is not waiting for a second player".to_string(),
        ));
    }

    let msg = ServerMessage::GameInvite(GameInviteMsg {
        session_id: summary.session_id.clone(),
        from_user_id: body.from_user_id.clone(),
        variant: summary.variant,
    });
    let delivered = state.presence.notify(&body.to_user_id, &msg).await;
    tracing::info!(
        session = %summary.session_id,
        from = %body.from_user_id,
        to = %body.to_user_id,
        delivered,
        "Game invite sent"
    );
    Ok(Json(Envelope::empty()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestBody {
    pub from_user_id: String,
    pub to_user_id: String,
}

/// POST /api/v1/friends/requests
pub async fn send_friend_request(
    State(state): State<AppState>,
    body: Result<Json<FriendRequestBody>, JsonRejection>,
) -> ApiResult<FriendRequestStatus> {
    let Json(body) = body?;
    validate_id("fromUserId", &body.from_user_id)?;
    validate_id("toUserId", &body.to_user_id)?;
    let status = run_detached(async move {
        let status = state
            .friends
            .send_request(&body.from_user_id, &body.to_user_id)
            .await?;
        Ok::<_, AppError>(status)
    })
    .await?;
    Ok(Json(Envelope::ok(status)))
}

/// POST /api/v1/friends/accept
///
/// `fromUserId` is the original requester, `toUserId` the user accepting.
pub async fn accept_friend_request(
    State(state): State<AppState>,
    body: Result<Json<FriendRequestBody>, JsonRejection>,
) -> ApiResult<()> {
    let Json(body) = body?;
    validate_id("fromUserId", &body.from_user_id)?;
    validate_id("toUserId", &body.to_user_id)?;
    run_detached(async move {
        state
            .friends
            .accept_request(&body.from_user_id, &body.to_user_id)
            .await?;
        Ok::<_, AppError>(())
    })
    .await?;
    Ok(Json(Envelope::empty()))
}

/// GET /api/v1/friends/{userId}
pub async fn friend_overview(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<FriendOverview> {
    let Path(user_id) = path?;
    validate_id("userId", &user_id)?;
    let overview = state.friends.overview(&user_id).await?;
    Ok(Json(Envelope::ok(overview)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUserBody {
    pub display_name: String,
}

/// PUT /api/v1/users/{userId}
pub async fn upsert_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<UpsertUserBody>, JsonRejection>,
) -> ApiResult<UserProfile> {
    let Path(user_id) = path?;
    let Json(body) = body?;
    validate_id("userId", &user_id)?;
    let max_len = state.config.limits.max_name_len;
    if !is_valid_display_name(&body.display_name, max_len) {
        return Err(AppError::Validation(format!(
            "display name must be 1-{max_len} chars without control characters"
        )));
    }
    let profile = UserProfile {
        id: user_id,
        display_name: body.display_name.trim().to_string(),
    };
    state.store.upsert_user(profile.clone()).await?;
    Ok(Json(Envelope::ok(profile)))
}

/// DELETE /api/v1/users/{userId}
///
/// Removes the profile together with its friendships and pending requests.
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<()> {
    let Path(user_id) = path?;
    validate_id("userId", &user_id)?;
    run_detached(async move {
        if !state.store.delete_user(&user_id).await? {
            return Err(AppError::NotFound(format!("user {user_id} not found")));
        }
        tracing::info!(user = %user_id, "User profile deleted");
        Ok::<_, AppError>(())
    })
    .await?;
    Ok(Json(Envelope::empty()))
}
