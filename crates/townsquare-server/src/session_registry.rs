use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use townsquare_core::game_trait::{GameError, TownGame};
use townsquare_core::player::Player;
use townsquare_core::session::{GameVariant, Phase, SessionId, SessionSummary};

use crate::games::ServerGameRegistry;

/// Errors returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotFound(SessionId),
    Forbidden(String),
    Game(GameError),
    VariantUnavailable(GameVariant),
    CapacityReached(usize),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "game {id} not found"),
            Self::Forbidden(m) => write!(f, "{m}"),
            Self::Game(e) => write!(f, "{e}"),
            Self::VariantUnavailable(v) => write!(f, "game variant {v} is not available"),
            Self::CapacityReached(max) => {
                write!(f, "server is at its limit of {max} game sessions")
            },
        }
    }
}

impl std::error::Error for SessionError {}

impl From<GameError> for SessionError {
    fn from(e: GameError) -> Self {
        Self::Game(e)
    }
}

/// Outcome of an accepted move.
#[derive(Debug, Clone)]
pub struct MoveResult {
    pub summary: SessionSummary,
    /// True when this move ended the game.
    pub finished_now: bool,
}

/// Session counts for the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub waiting: usize,
    pub active: usize,
    pub finished: usize,
}

struct SessionEntry {
    id: SessionId,
    town_id: String,
    game: Box<dyn TownGame>,
    /// Creation order, used for listing.
    seq: u64,
    /// Set under the entry lock by delete, so operations queued behind the
    /// delete see the session as gone.
    deleted: bool,
}

impl SessionEntry {
    fn summary(&self) -> SessionSummary {
        SessionSummary::from_game(&self.id, &self.town_id, self.game.as_ref())
    }
}

type SharedEntry = Arc<Mutex<SessionEntry>>;

/// Owns every live game session.
///
/// Each session sits behind its own FIFO mutex, so operations on one session
/// are applied strictly one at a time in the order they arrive while other
/// sessions proceed independently. The id map lock is never held while
/// waiting on a session lock, except in delete (session first, then map).
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SharedEntry>>,
    next_seq: AtomicU64,
    max_sessions: usize,
    games: ServerGameRegistry,
}

impl SessionRegistry {
    pub fn new(games: ServerGameRegistry, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            max_sessions,
            games,
        }
    }

    pub fn games(&self) -> &ServerGameRegistry {
        &self.games
    }

    /// Create a session with `player1` seated and return its summary.
    pub async fn create_session(
        &self,
        town_id: &str,
        variant: GameVariant,
        player1: Player,
        seed: Option<&serde_json::Value>,
    ) -> Result<SessionSummary, SessionError> {
        let mut game = self
            .games
            .create(variant)
            .ok_or(SessionError::VariantUnavailable(variant))?;
        let player1_id = player1.id.clone();
        game.initialize(player1, seed)?;

        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            tracing::warn!(max = self.max_sessions, "Session limit reached");
            return Err(SessionError::CapacityReached(self.max_sessions));
        }
        let mut id = Uuid::new_v4().to_string();
        while sessions.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }
        let entry = SessionEntry {
            id: id.clone(),
            town_id: town_id.to_string(),
            game,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            deleted: false,
        };
        let summary = entry.summary();
        sessions.insert(id.clone(), Arc::new(Mutex::new(entry)));
        drop(sessions);

        tracing::info!(
            session = %id,
            town = %town_id,
            %variant,
            player1 = %player1_id,
            "Game session created"
        );
        Ok(summary)
    }

    async fn entry(&self, id: &str) -> Result<SharedEntry, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn get_session(&self, id: &str) -> Result<SessionSummary, SessionError> {
        let entry = self.entry(id).await?;
        let entry = entry.lock().await;
        if entry.deleted {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(entry.summary())
    }

    /// Summaries of all sessions, optionally limited to one town, in
    /// creation order.
    pub async fn list_sessions(&self, town_id: Option<&str>) -> Vec<SessionSummary> {
        let entries: Vec<SharedEntry> = self.sessions.read().await.values().cloned().collect();

        let mut listed = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.lock().await;
            if entry.deleted || town_id.is_some_and(|t| t != entry.town_id) {
                continue;
            }
            listed.push((entry.seq, entry.summary()));
        }
        listed.sort_by_key(|(seq, _)| *seq);
        listed.into_iter().map(|(_, summary)| summary).collect()
    }

    /// Seat `player2` and activate the session.
    pub async fn join_session(
        &self,
        id: &str,
        player2: Player,
    ) -> Result<SessionSummary, SessionError> {
        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;
        if entry.deleted {
            return Err(SessionError::NotFound(id.to_string()));
        }
        let player2_id = player2.id.clone();
        entry.game.player_join(player2)?;
        tracing::info!(session = %id, player2 = %player2_id, "Player joined game");
        Ok(entry.summary())
    }

    /// Apply a move on behalf of `actor`, who must be a participant.
    pub async fn apply_move(
        &self,
        id: &str,
        actor: &str,
        move_data: &serde_json::Value,
    ) -> Result<MoveResult, SessionError> {
        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;
        if entry.deleted {
            return Err(SessionError::NotFound(id.to_string()));
        }
        if !entry.game.seats().is_participant(actor) {
            return Err(SessionError::Forbidden(
                "only participants can make moves".to_string(),
            ));
        }

        let was_finished = entry.game.seats().phase == Phase::Finished;
        if let Err(e) = entry.game.apply_move(actor, move_data) {
            tracing::debug!(session = %id, actor, error = %e, "Move rejected");
            return Err(e.into());
        }
        let finished_now = !was_finished && entry.game.seats().phase == Phase::Finished;
        let summary = entry.summary();
        if finished_now {
            tracing::info!(
                session = %id,
                winner = ?summary.winner_id,
                outcome = ?summary.outcome,
                "Game finished"
            );
        }
        Ok(MoveResult {
            summary,
            finished_now,
        })
    }

    /// Remove a session at any phase. Only participants may delete. Returns
    /// the last summary so callers can notify the other participant.
    pub async fn delete_session(
        &self,
        id: &str,
        requester: &str,
    ) -> Result<SessionSummary, SessionError> {
        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;
        if entry.deleted {
            return Err(SessionError::NotFound(id.to_string()));
        }
        if !entry.game.seats().is_participant(requester) {
            return Err(SessionError::Forbidden(
                "only participants can delete a game".to_string(),
            ));
        }
        entry.deleted = true;
        let summary = entry.summary();
        self.sessions.write().await.remove(id);
        drop(entry);

        tracing::info!(session = %id, requester, phase = ?summary.phase, "Game session deleted");
        Ok(summary)
    }

    pub async fn stats(&self) -> RegistryStats {
        let entries: Vec<SharedEntry> = self.sessions.read().await.values().cloned().collect();
        let mut stats = RegistryStats::default();
        for entry in entries {
            let entry = entry.lock().await;
            if entry.deleted {
                continue;
            }
            stats.total += 1;
            match entry.game.seats().phase {
                Phase::WaitingForPlayer2 => stats.waiting += 1,
                Phase::Active => stats.active += 1,
                Phase::Finished => stats.finished += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GamesConfig;
    use townsquare_core::test_helpers::make_player;

    fn registry(max_sessions: usize) -> SessionRegistry {
        SessionRegistry::new(ServerGameRegistry::new(GamesConfig::default()), max_sessions)
    }

    fn at(row: i64, col: i64) -> serde_json::Value {
        serde_json::json!({ "row": row, "col": col })
    }

    async fn active_grid(reg: &SessionRegistry) -> String {
        let summary = reg
            .create_session("town-1", GameVariant::ThreeInARow, make_player("a"), None)
            .await
            .unwrap();
        reg.join_session(&summary.session_id, make_player("b"))
            .await
            .unwrap();
        summary.session_id
    }

    #[tokio::test]
    async fn create_and_get() {
        let reg = registry(10);
        let created = reg
            .create_session("town-1", GameVariant::ThreeInARow, make_player("a"), None)
            .await
            .unwrap();
        assert_eq!(created.phase, Phase::WaitingForPlayer2);
        assert_eq!(created.player1_id, "a");
        assert_eq!(created.player1_name, "Player a");
        assert!(created.player2_id.is_none());

        let fetched = reg.get_session(&created.session_id).await.unwrap();
        assert_eq!(fetched, created);
        assert!(matches!(
            reg.get_session("missing").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let reg = registry(100);
        let mut ids = std::collections::HashSet::new();
        for _ in 0..50 {
            let s = reg
                .create_session("t", GameVariant::ThreeInARow, make_player("a"), None)
                .await
                .unwrap();
            assert!(ids.insert(s.session_id));
        }
    }

    #[tokio::test]
    async fn invalid_seed_creates_nothing() {
        let reg = registry(10);
        let bad = serde_json::json!({ "word": "x" });
        let err = reg
            .create_session("t", GameVariant::WordGuess, make_player("a"), Some(&bad))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Game(GameError::InvalidSeed(_))));
        assert!(reg.list_sessions(None).await.is_empty());
    }

    #[tokio::test]
    async fn capacity_limit_enforced() {
        let reg = registry(2);
        for _ in 0..2 {
            reg.create_session("t", GameVariant::ThreeInARow, make_player("a"), None)
                .await
                .unwrap();
        }
        let err = reg
            .create_session("t", GameVariant::ThreeInARow, make_player("a"), None)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::CapacityReached(2));
    }

    #[tokio::test]
    async fn list_filters_by_town_in_creation_order() {
        let reg = registry(10);
        let mut expected = Vec::new();
        for (i, town) in ["north", "south", "north", "north"].iter().enumerate() {
            let s = reg
                .create_session(town, GameVariant::ThreeInARow, make_player(&format!("p{i}")), None)
                .await
                .unwrap();
            if *town == "north" {
                expected.push(s.session_id);
            }
        }
        let listed: Vec<String> = reg
            .list_sessions(Some("north"))
            .await
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(listed, expected);
        assert_eq!(reg.list_sessions(None).await.len(), 4);
        assert!(reg.list_sessions(Some("east")).await.is_empty());
    }

    #[tokio::test]
    async fn join_errors_propagate() {
        let reg = registry(10);
        let s = reg
            .create_session("t", GameVariant::ThreeInARow, make_player("a"), None)
            .await
            .unwrap();
        assert_eq!(
            reg.join_session(&s.session_id, make_player("a")).await,
            Err(SessionError::Game(GameError::SelfJoin))
        );
        let joined = reg
            .join_session(&s.session_id, make_player("b"))
            .await
            .unwrap();
        assert_eq!(joined.phase, Phase::Active);
        assert_eq!(joined.current_turn.as_deref(), Some("a"));
        assert_eq!(
            reg.join_session(&s.session_id, make_player("c")).await,
            Err(SessionError::Game(GameError::AlreadyFull))
        );
        assert!(matches!(
            reg.join_session("missing", make_player("c")).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn moves_require_participant() {
        let reg = registry(10);
        let id = active_grid(&reg).await;
        assert!(matches!(
            reg.apply_move(&id, "mallory", &at(0, 0)).await,
            Err(SessionError::Forbidden(_))
        ));
        assert_eq!(
            reg.apply_move(&id, "b", &at(0, 0)).await.unwrap_err(),
            SessionError::Game(GameError::NotYourTurn)
        );
        let result = reg.apply_move(&id, "a", &at(0, 0)).await.unwrap();
        assert!(!result.finished_now);
        assert_eq!(result.summary.current_turn.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn finishing_move_reported_once() {
        let reg = registry(10);
        let id = active_grid(&reg).await;
        for (actor, r, c) in [("a", 0, 0), ("b", 1, 1), ("a", 0, 1), ("b", 1, 0)] {
            assert!(!reg.apply_move(&id, actor, &at(r, c)).await.unwrap().finished_now);
        }
        let last = reg.apply_move(&id, "a", &at(0, 2)).await.unwrap();
        assert!(last.finished_now);
        assert_eq!(last.summary.winner_id.as_deref(), Some("a"));
        assert_eq!(
            reg.apply_move(&id, "b", &at(2, 2)).await.unwrap_err(),
            SessionError::Game(GameError::GameNotActive)
        );
    }

    #[tokio::test]
    async fn delete_requires_participant_and_removes() {
        let reg = registry(10);
        let id = active_grid(&reg).await;
        reg.apply_move(&id, "a", &at(1, 1)).await.unwrap();

        assert!(matches!(
            reg.delete_session(&id, "mallory").await,
            Err(SessionError::Forbidden(_))
        ));
        let last = reg.delete_session(&id, "b").await.unwrap();
        assert_eq!(last.phase, Phase::Active);

        assert!(matches!(
            reg.get_session(&id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            reg.apply_move(&id, "b", &at(0, 0)).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            reg.delete_session(&id, "a").await,
            Err(SessionError::NotFound(_))
        ));
        assert!(reg.list_sessions(None).await.is_empty());
    }

    #[tokio::test]
    async fn stats_count_phases() {
        let reg = registry(10);
        reg.create_session("t", GameVariant::ThreeInARow, make_player("a"), None)
            .await
            .unwrap();
        active_grid(&reg).await;
        assert_eq!(
            reg.stats().await,
            RegistryStats {
                total: 2,
                waiting: 1,
                active: 1,
                finished: 0,
            }
        );
    }

    #[test]
    fn session_error_display() {
        assert_eq!(
            SessionError::NotFound("s-1".to_string()).to_string(),
            "game s-1 not found"
        );
        assert_eq!(
            SessionError::Game(GameError::NotYourTurn).to_string(),
            "not your turn"
        );
    }
}
