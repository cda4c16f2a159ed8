use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use townsquare_core::game_trait::GameMetadata;

use crate::presence::PresenceStats;
use crate::session_registry::RegistryStats;
use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    pub sessions: RegistryStats,
    pub games: Vec<GameMetadata>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub websocket: usize,
    pub online_users: usize,
}

impl ConnectionInfo {
    fn new(websocket: usize, presence: PresenceStats) -> Self {
        Self {
            websocket,
            online_users: presence.online_users,
        }
    }
}

/// GET /health. Unenveloped so load balancers can read it directly.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ws = state.ws_connection_count.load(Ordering::Relaxed);
    let presence = state.presence.stats().await;
    let sessions = state.sessions.stats().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo::new(ws, presence),
        sessions,
        games: state.sessions.games().catalog(),
    })
}

/// GET /ready. Ready once at least one game is registered.
pub async fn readiness_check(State(state): State<AppState>) -> &'static str {
    if state.sessions.games().available_games() == 0 {
        return "not ready: no games registered";
    }
    "ready"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use townsquare_core::session::GameVariant;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            connections: ConnectionInfo {
                websocket: 5,
                online_users: 2,
            },
            sessions: RegistryStats {
                total: 3,
                waiting: 1,
                active: 1,
                finished: 1,
            },
            games: vec![GameMetadata {
                variant: GameVariant::ThreeInARow,
                name: "Three in a Row".to_string(),
                description: "Classic 3x3 grid".to_string(),
            }],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("\"websocket\":5"));
        assert!(json.contains("\"onlineUsers\":2"));
        assert!(json.contains("\"waiting\":1"));
        assert!(json.contains("\"variant\":\"threeInARow\""));
    }

    #[tokio::test]
    async fn health_reflects_presence() {
        let state = AppState::new(ServerConfig::default());
        let (_id, _rx) = state.presence.connect("alice").await;
        let Json(resp) = health_check(State(state)).await;
        assert_eq!(resp.status, "healthy");
        assert_eq!(resp.connections.online_users, 1);
        assert_eq!(resp.sessions.total, 0);
    }

    #[tokio::test]
    #[cfg(any(feature = "tictactoe", feature = "wordguess", feature = "truths"))]
    async fn ready_with_registered_games() {
        let state = AppState::new(ServerConfig::default());
        assert_eq!(readiness_check(State(state)).await, "ready");
    }
}
