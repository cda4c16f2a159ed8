pub mod words;

use serde::{Deserialize, Serialize};

use townsquare_core::game_trait::{
    GameError, GameMetadata, Seat, Seats, TownGame, parse_move, parse_seed,
};
use townsquare_core::player::Player;
use townsquare_core::session::{GameVariant, Phase};

const GAME_NAME: &str = "Word Guess";

/// Default number of misses before the setter wins.
pub const DEFAULT_MAX_MISSES: u8 = 6;

/// Full internal state, including the secret word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordGuessState {
    pub word: String,
    /// Guessed letters in the order they were tried.
    pub guessed: Vec<char>,
    pub misses: u8,
    pub max_misses: u8,
    /// Set when the whole word was guessed outright.
    pub solved: bool,
}

impl WordGuessState {
    fn all_revealed(&self) -> bool {
        !self.word.is_empty() && self.word.chars().all(|c| self.guessed.contains(&c))
    }

    fn masked(&self) -> String {
        self.word
            .chars()
            .map(|c| if self.guessed.contains(&c) { c } else { '_' })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WordSeed {
    word: String,
}

/// Move payload: one letter or a whole-word attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Guess {
    Letter { letter: String },
    Word { word: String },
}

/// Word guess, implementing `TownGame`. Player 1 sets the word, player 2
/// guesses and always holds the turn.
#[derive(Debug)]
pub struct WordGuess {
    seats: Seats,
    state: WordGuessState,
}

impl WordGuess {
    pub fn new() -> Self {
        Self::with_max_misses(DEFAULT_MAX_MISSES)
    }

    /// Create a game that ends after `max_misses` wrong guesses.
    pub fn with_max_misses(max_misses: u8) -> Self {
        Self {
            seats: Seats::default(),
            state: WordGuessState {
                max_misses: max_misses.max(1),
                ..WordGuessState::default()
            },
        }
    }

    pub fn state(&self) -> &WordGuessState {
        &self.state
    }

    fn seat_id(&self, seat: Seat) -> Option<String> {
        self.seats.player(seat).map(|p| p.id.clone())
    }

    fn settle(&mut self) {
        if self.state.solved || self.state.all_revealed() {
            let winner = self.seat_id(Seat::Player2);
            self.finish_game(winner);
        } else if self.state.misses >= self.state.max_misses {
            let winner = self.seat_id(Seat::Player1);
            self.finish_game(winner);
        }
    }
}

impl Default for WordGuess {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated, lowercased guess.
#[derive(Debug, PartialEq, Eq)]
enum Attempt {
    Letter(char),
    Word(String),
}

/// Letters must be a single ASCII letter, words a non-empty run of ASCII
/// letters.
fn normalize_guess(guess: Guess) -> Result<Attempt, GameError> {
    match guess {
        Guess::Letter { letter } => {
            let mut chars = letter.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => {
                    Ok(Attempt::Letter(c.to_ascii_lowercase()))
                },
                _ => Err(GameError::IllegalMove(format!(
                    "'{letter}' is not a single letter"
                ))),
            }
        },
        Guess::Word { word } => {
            let trimmed = word.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(GameError::IllegalMove(format!(
                    "'{word}' is not a word of letters"
                )));
            }
            Ok(Attempt::Word(trimmed.to_ascii_lowercase()))
        },
    }
}

impl TownGame for WordGuess {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            variant: GameVariant::WordGuess,
            name: GAME_NAME.to_string(),
            description: "One player picks a secret word, the other guesses it letter by letter."
                .to_string(),
        }
    }

    fn initialize(
        &mut self,
        player1: Player,
        seed: Option<&serde_json::Value>,
    ) -> Result<(), GameError> {
        let word = match seed.filter(|s| !s.is_null()) {
            Some(seed) => {
                let parsed: WordSeed = parse_seed(seed)?;
                words::normalize_secret(&parsed.word).ok_or_else(|| {
                    GameError::InvalidSeed("word must be 3 to 24 letters".to_string())
                })?
            },
            None => words::random_word().to_string(),
        };

        self.seats.reset(player1, Seat::Player2);
        self.state = WordGuessState {
            word,
            max_misses: self.state.max_misses,
            ..WordGuessState::default()
        };
        Ok(())
    }

    fn apply_move(
        &mut self,
        acting_player_id: &str,
        move_data: &serde_json::Value,
    ) -> Result<(), GameError> {
        self.seats.ensure_active()?;

        let attempt = normalize_guess(parse_move(move_data)?)?;
        if let Attempt::Letter(c) = attempt
            && self.state.guessed.contains(&c)
        {
            return Err(GameError::IllegalMove(format!("'{c}' was already guessed")));
        }
        self.seats.ensure_turn(acting_player_id)?;

        match attempt {
            Attempt::Letter(c) => {
                self.state.guessed.push(c);
                if !self.state.word.contains(c) {
                    self.state.misses += 1;
                }
            },
            Attempt::Word(word) if word == self.state.word => self.state.solved = true,
            Attempt::Word(_) => self.state.misses += 1,
        }
        self.settle();
        Ok(())
    }

    fn is_game_over(&self) -> bool {
        self.state.solved
            || self.state.all_revealed()
            || self.state.misses >= self.state.max_misses
    }

    fn state_view(&self) -> serde_json::Value {
        let finished = self.seats.phase == Phase::Finished;
        let masked = if finished {
            self.state.word.clone()
        } else {
            self.state.masked()
        };
        let mut view = serde_json::json!({
            "masked": masked,
            "length": self.state.word.len(),
            "guessed": self.state.guessed,
            "misses": self.state.misses,
            "maxMisses": self.state.max_misses,
        });
        if finished {
            view["word"] = serde_json::Value::String(self.state.word.clone());
        }
        view
    }

    townsquare_core::town_game_boilerplate!(name: GAME_NAME);
}
