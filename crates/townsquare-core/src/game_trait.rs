use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::player::{Player, PlayerId};
use crate::session::{GameVariant, Phase};

/// Core trait that every Townsquare mini-game implements.
///
/// The session registry owns seating, locking, and notification; the game
/// only validates and applies its own moves. Implementations must leave their
/// state untouched when a call returns an error.
pub trait TownGame: Send + Sync {
    /// Game metadata for the lobby listing.
    fn metadata(&self) -> GameMetadata;

    /// Seat player 1 and build the initial state from an optional
    /// variant-specific seed. Resets the phase to `WaitingForPlayer2`.
    fn initialize(
        &mut self,
        player1: Player,
        seed: Option<&serde_json::Value>,
    ) -> Result<(), GameError>;

    /// Seat player 2 and make the game active.
    fn player_join(&mut self, player2: Player) -> Result<(), GameError>;

    /// Validate and apply a move on behalf of `acting_player_id`.
    fn apply_move(
        &mut self,
        acting_player_id: &str,
        move_data: &serde_json::Value,
    ) -> Result<(), GameError>;

    /// Whether the current state is terminal.
    fn is_game_over(&self) -> bool;

    /// Mark the game finished. Repeated calls return the first summary and
    /// change nothing.
    fn finish_game(&mut self, winner: Option<PlayerId>) -> String;

    /// Seat, turn, and phase bookkeeping.
    fn seats(&self) -> &Seats;

    /// Public JSON view of the state. Hidden information stays hidden until
    /// the game is finished.
    fn state_view(&self) -> serde_json::Value;

    /// Full internal snapshot (MessagePack).
    fn serialize_state(&self) -> Vec<u8>;
}

/// Game metadata for the lobby listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub variant: GameVariant,
    pub name: String,
    pub description: String,
}

/// Which of the two seats a player occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seat {
    Player1,
    Player2,
}

impl Seat {
    pub fn other(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }
}

/// Errors a game can return from join or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    AlreadyFull,
    SelfJoin,
    GameNotActive,
    NotYourTurn,
    IllegalMove(String),
    InvalidSeed(String),
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyFull => write!(f, "game already has two players"),
            Self::SelfJoin => write!(f, "cannot join your own game"),
            Self::GameNotActive => write!(f, "game is not active"),
            Self::NotYourTurn => write!(f, "not your turn"),
            Self::IllegalMove(reason) => write!(f, "illegal move: {reason}"),
            Self::InvalidSeed(reason) => write!(f, "invalid game setup: {reason}"),
        }
    }
}

impl std::error::Error for GameError {}

/// Seat, turn, and phase bookkeeping shared by every game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seats {
    pub player1: Option<Player>,
    pub player2: Option<Player>,
    pub phase: Phase,
    pub current_turn: Option<Seat>,
    pub winner: Option<PlayerId>,
    pub outcome: Option<String>,
}

impl Seats {
    /// Seat player 1 and reset everything else. `first_turn` is the seat that
    /// moves first once the game becomes active.
    pub fn reset(&mut self, player1: Player, first_turn: Seat) {
        *self = Self {
            player1: Some(player1),
            current_turn: Some(first_turn),
            ..Self::default()
        };
    }

    /// Seat player 2. A full game is rejected before the identity check.
    pub fn join(&mut self, player2: Player) -> Result<(), GameError> {
        if self.player2.is_some() {
            return Err(GameError::AlreadyFull);
        }
        let Some(ref player1) = self.player1 else {
            return Err(GameError::GameNotActive);
        };
        if player1.id == player2.id {
            return Err(GameError::SelfJoin);
        }
        self.player2 = Some(player2);
        self.phase = Phase::Active;
        Ok(())
    }

    pub fn player(&self, seat: Seat) -> Option<&Player> {
        match seat {
            Seat::Player1 => self.player1.as_ref(),
            Seat::Player2 => self.player2.as_ref(),
        }
    }

    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        if self.player1.as_ref().is_some_and(|p| p.id == player_id) {
            Some(Seat::Player1)
        } else if self.player2.as_ref().is_some_and(|p| p.id == player_id) {
            Some(Seat::Player2)
        } else {
            None
        }
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.seat_of(player_id).is_some()
    }

    /// The player who must move next. Only defined while active.
    pub fn turn_holder(&self) -> Option<&Player> {
        if self.phase != Phase::Active {
            return None;
        }
        self.current_turn.and_then(|seat| self.player(seat))
    }

    pub fn ensure_active(&self) -> Result<(), GameError> {
        if self.phase == Phase::Active {
            Ok(())
        } else {
            Err(GameError::GameNotActive)
        }
    }

    /// Confirm `player_id` holds the turn, returning their seat.
    pub fn ensure_turn(&self, player_id: &str) -> Result<Seat, GameError> {
        match (self.current_turn, self.turn_holder()) {
            (Some(seat), Some(holder)) if holder.id == player_id => Ok(seat),
            _ => Err(GameError::NotYourTurn),
        }
    }

    pub fn flip_turn(&mut self) {
        self.current_turn = self.current_turn.map(Seat::other);
    }

    pub fn set_turn(&mut self, seat: Seat) {
        self.current_turn = Some(seat);
    }

    /// Transition to `Finished`. Idempotent: once finished, the stored
    /// outcome is returned unchanged.
    pub fn finish(&mut self, winner: Option<PlayerId>, game_name: &str) -> String {
        if let Some(ref outcome) = self.outcome {
            return outcome.clone();
        }
        let outcome = match winner.as_deref() {
            Some(id) => {
                let name = self
                    .seat_of(id)
                    .and_then(|seat| self.player(seat))
                    .map_or(id, |p| p.name.as_str());
                format!("{name} won {game_name}")
            },
            None => format!("{game_name} ended in a draw"),
        };
        tracing::debug!(game = game_name, winner = ?winner, "Game finished");
        self.phase = Phase::Finished;
        self.current_turn = None;
        self.winner = winner;
        self.outcome = Some(outcome.clone());
        outcome
    }
}

/// Decode a move payload, mapping structural problems to `IllegalMove`.
pub fn parse_move<T: DeserializeOwned>(data: &serde_json::Value) -> Result<T, GameError> {
    serde_json::from_value(data.clone())
        .map_err(|e| GameError::IllegalMove(format!("malformed move: {e}")))
}

/// Decode a seed payload, mapping structural problems to `InvalidSeed`.
pub fn parse_seed<T: DeserializeOwned>(data: &serde_json::Value) -> Result<T, GameError> {
    serde_json::from_value(data.clone()).map_err(|e| GameError::InvalidSeed(e.to_string()))
}

/// Generates the `TownGame` methods that are identical across all games:
/// `player_join`, `finish_game`, `seats`, `serialize_state`.
///
/// Requires the implementing struct to have `seats: Seats` and a serializable
/// `state` field.
#[macro_export]
macro_rules! town_game_boilerplate {
    (name: $name:expr) => {
        fn player_join(
            &mut self,
            player2: $crate::player::Player,
        ) -> Result<(), $crate::game_trait::GameError> {
            self.seats.join(player2)
        }

        fn finish_game(&mut self, winner: Option<$crate::player::PlayerId>) -> String {
            self.seats.finish(winner, $name)
        }

        fn seats(&self) -> &$crate::game_trait::Seats {
            &self.seats
        }

        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec_named(&(&self.seats, &self.state)).unwrap_or_default()
        }
    };
}
