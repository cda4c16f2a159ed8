pub mod board;

use serde::{Deserialize, Serialize};

use townsquare_core::game_trait::{
    GameError, GameMetadata, Seat, Seats, TownGame, parse_move,
};
use townsquare_core::player::Player;
use townsquare_core::session::GameVariant;

use board::{Board, Cell, SIZE};

const GAME_NAME: &str = "Three-in-a-row";

/// Serializable board state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicTacToeState {
    pub board: Board,
    pub moves: u8,
}

/// Move payload: the cell to mark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceMark {
    pub row: i64,
    pub col: i64,
}

/// Three-in-a-row, implementing `TownGame`. Player 1 always moves first.
#[derive(Debug, Default)]
pub struct ThreeInARow {
    seats: Seats,
    state: TicTacToeState,
}

impl ThreeInARow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accessor for the current board state.
    pub fn state(&self) -> &TicTacToeState {
        &self.state
    }
}

fn board_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok().filter(|&v| v < SIZE)
}

impl TownGame for ThreeInARow {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            variant: GameVariant::ThreeInARow,
            name: GAME_NAME.to_string(),
            description: "Take turns marking a 3x3 grid. Three in a line wins.".to_string(),
        }
    }

    fn initialize(
        &mut self,
        player1: Player,
        seed: Option<&serde_json::Value>,
    ) -> Result<(), GameError> {
        if seed.is_some_and(|s| !s.is_null()) {
            return Err(GameError::InvalidSeed(
                "three-in-a-row takes no setup".to_string(),
            ));
        }
        self.seats.reset(player1, Seat::Player1);
        self.state = TicTacToeState::default();
        Ok(())
    }

    fn apply_move(
        &mut self,
        acting_player_id: &str,
        move_data: &serde_json::Value,
    ) -> Result<(), GameError> {
        self.seats.ensure_active()?;

        let mv: PlaceMark = parse_move(move_data)?;
        let (Some(row), Some(col)) = (board_index(mv.row), board_index(mv.col)) else {
            return Err(GameError::IllegalMove(format!(
                "({}, {}) is off the board",
                mv.row, mv.col
            )));
        };
        if self.state.board.get(row, col) != Cell::Empty {
            return Err(GameError::IllegalMove(format!(
                "cell ({row}, {col}) is already taken"
            )));
        }
        let seat = self.seats.ensure_turn(acting_player_id)?;

        let mark = Cell::for_seat(seat);
        self.state.board.place(row, col, mark);
        self.state.moves += 1;

        if self.state.board.completes_line(mark) {
            let outcome = self.finish_game(Some(acting_player_id.to_string()));
            tracing::debug!(%outcome, moves = self.state.moves, "Line completed");
        } else if self.state.board.is_full() {
            self.finish_game(None);
        } else {
            self.seats.flip_turn();
        }
        Ok(())
    }

    fn is_game_over(&self) -> bool {
        self.state.board.winning_mark().is_some() || self.state.board.is_full()
    }

    fn state_view(&self) -> serde_json::Value {
        serde_json::to_value(&self.state).unwrap_or_default()
    }

    townsquare_core::town_game_boilerplate!(name: GAME_NAME);
}
