pub mod api;
pub mod config;
pub mod error;
pub mod friends;
pub mod games;
pub mod health;
pub mod presence;
pub mod session_registry;
pub mod state;
pub mod store;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;
use store::UserStore;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);
    (router(state.clone()), state)
}

/// Build the router over a caller-supplied user store.
pub fn build_app_with_store(
    config: ServerConfig,
    store: Arc<dyn UserStore>,
) -> (Router<()>, AppState) {
    let state = AppState::with_store(config, store);
    (router(state.clone()), state)
}

fn router(state: AppState) -> Router<()> {
    let timeout = Duration::from_secs(state.config.limits.request_timeout_secs);

    let api_routes = Router::new()
        .route("/games", post(api::create_game).get(api::list_games))
        .route("/games/{id}", get(api::get_game).delete(api::delete_game))
        .route("/games/{id}/join", post(api::join_game))
        .route("/games/{id}/moves", post(api::apply_move))
        .route("/games/{id}/invite", post(api::invite_to_game))
        .route("/friends/requests", post(api::send_friend_request))
        .route("/friends/accept", post(api::accept_friend_request))
        .route("/friends/{user_id}", get(api::friend_overview))
        .route(
            "/users/{user_id}",
            put(api::upsert_user).delete(api::delete_user),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(axum::middleware::map_response(error::envelope_timeout));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
