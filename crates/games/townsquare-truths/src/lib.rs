use serde::{Deserialize, Serialize};

use townsquare_core::game_trait::{
    GameError, GameMetadata, Seat, Seats, TownGame, parse_move, parse_seed,
};
use townsquare_core::player::Player;
use townsquare_core::session::{GameVariant, Phase};

const GAME_NAME: &str = "Two Truths and a Lie";

/// Statements per round.
pub const STATEMENT_COUNT: usize = 3;

/// Maximum characters per statement.
pub const MAX_STATEMENT_LEN: usize = 200;

/// Which half of the round is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Player 1 still has to write the statements.
    #[default]
    Authoring,
    /// Player 2 picks the statement they believe is the lie.
    Choosing,
}

/// Full internal state, including the lie index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthsState {
    pub stage: Stage,
    pub statements: Vec<String>,
    pub lie: Option<usize>,
    pub choice: Option<usize>,
}

/// Statements plus the index of the lie. Used both as the seed and as the
/// authoring move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statements {
    pub statements: Vec<String>,
    pub lie: i64,
}

/// Move payload for either stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TruthsMove {
    Author(Statements),
    Choose { choice: i64 },
}

fn statement_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok().filter(|&i| i < STATEMENT_COUNT)
}

/// Check shape and lengths, returning trimmed statements and the lie index.
fn validate_statements(input: Statements) -> Result<(Vec<String>, usize), String> {
    if input.statements.len() != STATEMENT_COUNT {
        return Err(format!(
            "expected {STATEMENT_COUNT} statements, got {}",
            input.statements.len()
        ));
    }
    let statements: Vec<String> = input
        .statements
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    if let Some(bad) = statements
        .iter()
        .position(|s| s.is_empty() || s.chars().count() > MAX_STATEMENT_LEN)
    {
        return Err(format!(
            "statement {bad} must be 1 to {MAX_STATEMENT_LEN} characters"
        ));
    }
    let lie = statement_index(input.lie)
        .ok_or_else(|| format!("lie index {} is out of range", input.lie))?;
    Ok((statements, lie))
}

/// Two truths and a lie, implementing `TownGame`.
#[derive(Debug, Default)]
pub struct TwoTruthsAndALie {
    seats: Seats,
    state: TruthsState,
}

impl TwoTruthsAndALie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TruthsState {
        &self.state
    }
}

impl TownGame for TwoTruthsAndALie {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            variant: GameVariant::TruthsAndLie,
            name: GAME_NAME.to_string(),
            description: "One player writes three statements, the other spots the lie."
                .to_string(),
        }
    }

    fn initialize(
        &mut self,
        player1: Player,
        seed: Option<&serde_json::Value>,
    ) -> Result<(), GameError> {
        let state = match seed.filter(|s| !s.is_null()) {
            Some(seed) => {
                let (statements, lie) =
                    validate_statements(parse_seed(seed)?).map_err(GameError::InvalidSeed)?;
                TruthsState {
                    stage: Stage::Choosing,
                    statements,
                    lie: Some(lie),
                    choice: None,
                }
            },
            None => TruthsState::default(),
        };
        let first = match state.stage {
            Stage::Authoring => Seat::Player1,
            Stage::Choosing => Seat::Player2,
        };
        self.seats.reset(player1, first);
        self.state = state;
        Ok(())
    }

    fn apply_move(
        &mut self,
        acting_player_id: &str,
        move_data: &serde_json::Value,
    ) -> Result<(), GameError> {
        self.seats.ensure_active()?;

        match (parse_move::<TruthsMove>(move_data)?, self.state.stage) {
            (TruthsMove::Author(input), Stage::Authoring) => {
                let (statements, lie) =
                    validate_statements(input).map_err(GameError::IllegalMove)?;
                self.seats.ensure_turn(acting_player_id)?;

                self.state.statements = statements;
                self.state.lie = Some(lie);
                self.state.stage = Stage::Choosing;
                self.seats.set_turn(Seat::Player2);
                Ok(())
            },
            (TruthsMove::Choose { choice }, Stage::Choosing) => {
                let choice = statement_index(choice).ok_or_else(|| {
                    GameError::IllegalMove(format!("choice {choice} is out of range"))
                })?;
                let seat = self.seats.ensure_turn(acting_player_id)?;

                self.state.choice = Some(choice);
                let winner_seat = if self.state.lie == Some(choice) {
                    seat
                } else {
                    seat.other()
                };
                let winner = self.seats.player(winner_seat).map(|p| p.id.clone());
                self.finish_game(winner);
                Ok(())
            },
            (TruthsMove::Author(_), Stage::Choosing) => Err(GameError::IllegalMove(
                "statements are already written".to_string(),
            )),
            (TruthsMove::Choose { .. }, Stage::Authoring) => Err(GameError::IllegalMove(
                "statements have not been written yet".to_string(),
            )),
        }
    }

    fn is_game_over(&self) -> bool {
        self.state.choice.is_some()
    }

    fn state_view(&self) -> serde_json::Value {
        let mut view = serde_json::json!({
            "stage": self.state.stage,
            "statements": self.state.statements,
            "choice": self.state.choice,
        });
        if self.seats.phase == Phase::Finished {
            view["lie"] = serde_json::json!(self.state.lie);
        }
        view
    }

    townsquare_core::town_game_boilerplate!(name: GAME_NAME);
}
