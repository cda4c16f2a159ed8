use std::collections::HashMap;

use townsquare_core::game_trait::{GameMetadata, TownGame};
use townsquare_core::session::GameVariant;

use crate::config::GamesConfig;

/// Factory function type for creating game instances on the server.
type ServerGameFactory = fn(&GamesConfig) -> Box<dyn TownGame>;

/// Registry mapping variants to factory functions. Only variants whose cargo
/// feature is enabled are registered.
pub struct ServerGameRegistry {
    factories: HashMap<GameVariant, ServerGameFactory>,
    settings: GamesConfig,
}

impl Default for ServerGameRegistry {
    fn default() -> Self {
        Self::new(GamesConfig::default())
    }
}

impl ServerGameRegistry {
    pub fn new(settings: GamesConfig) -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
            settings,
        };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        #[cfg(feature = "tictactoe")]
        self.factories.insert(GameVariant::ThreeInARow, |_| {
            Box::new(townsquare_tictactoe::ThreeInARow::new())
        });
        #[cfg(feature = "wordguess")]
        self.factories.insert(GameVariant::WordGuess, |settings| {
            Box::new(townsquare_wordguess::WordGuess::with_max_misses(
                settings.word_guess_max_misses,
            ))
        });
        #[cfg(feature = "truths")]
        self.factories.insert(GameVariant::TruthsAndLie, |_| {
            Box::new(townsquare_truths::TwoTruthsAndALie::new())
        });
    }

    pub fn create(&self, variant: GameVariant) -> Option<Box<dyn TownGame>> {
        self.factories.get(&variant).map(|f| f(&self.settings))
    }

    /// Return the number of registered game types.
    pub fn available_games(&self) -> usize {
        self.factories.len()
    }

    /// Registered variants, in declaration order.
    pub fn variants(&self) -> Vec<GameVariant> {
        GameVariant::ALL
            .into_iter()
            .filter(|v| self.factories.contains_key(v))
            .collect()
    }

    /// Metadata of every registered game, in declaration order.
    pub fn catalog(&self) -> Vec<GameMetadata> {
        self.variants()
            .into_iter()
            .filter_map(|v| self.create(v))
            .map(|game| game.metadata())
            .collect()
    }
}
