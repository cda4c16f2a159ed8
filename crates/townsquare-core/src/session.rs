use serde::{Deserialize, Serialize};

use crate::game_trait::TownGame;
use crate::player::PlayerId;

/// Opaque identifier of one game session.
pub type SessionId = String;

/// The game types a session can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameVariant {
    ThreeInARow,
    WordGuess,
    TruthsAndLie,
}

impl GameVariant {
    pub const ALL: [GameVariant; 3] = [Self::ThreeInARow, Self::WordGuess, Self::TruthsAndLie];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ThreeInARow => "threeInARow",
            Self::WordGuess => "wordGuess",
            Self::TruthsAndLie => "truthsAndLie",
        }
    }

    /// Parse the wire name of a variant.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl std::fmt::Display for GameVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage of a session. Transitions only move forward:
/// `WaitingForPlayer2 -> Active -> Finished`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    WaitingForPlayer2,
    Active,
    Finished,
}

/// Snapshot of a session as seen by clients and the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    pub town_id: String,
    pub variant: GameVariant,
    pub player1_id: PlayerId,
    pub player1_name: String,
    pub player2_id: Option<PlayerId>,
    pub player2_name: Option<String>,
    pub phase: Phase,
    pub current_turn: Option<PlayerId>,
    pub winner_id: Option<PlayerId>,
    pub outcome: Option<String>,
    /// Variant-specific public view of the game state.
    pub state: serde_json::Value,
}

impl SessionSummary {
    pub fn from_game(session_id: &str, town_id: &str, game: &dyn TownGame) -> Self {
        let seats = game.seats();
        let (player1_id, player1_name) = seats
            .player1
            .as_ref()
            .map(|p| (p.id.clone(), p.name.clone()))
            .unwrap_or_default();
        Self {
            session_id: session_id.to_string(),
            town_id: town_id.to_string(),
            variant: game.metadata().variant,
            player1_id,
            player1_name,
            player2_id: seats.player2.as_ref().map(|p| p.id.clone()),
            player2_name: seats.player2.as_ref().map(|p| p.name.clone()),
            phase: seats.phase,
            current_turn: seats.turn_holder().map(|p| p.id.clone()),
            winner_id: seats.winner.clone(),
            outcome: seats.outcome.clone(),
            state: game.state_view(),
        }
    }

    /// Whether `player_id` occupies either seat.
    pub fn is_participant(&self, player_id: &str) -> bool {
        self.player1_id == player_id || self.player2_id.as_deref() == Some(player_id)
    }

    /// The participant other than `player_id`, if seated.
    pub fn opponent_of(&self, player_id: &str) -> Option<&str> {
        if self.player1_id == player_id {
            self.player2_id.as_deref()
        } else if self.player2_id.as_deref() == Some(player_id) {
            Some(self.player1_id.as_str())
        } else {
            None
        }
    }
}
