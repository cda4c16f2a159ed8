pub mod envelope;
pub mod game_trait;
pub mod net;
pub mod player;
pub mod session;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game_trait::{GameError, TownGame};
    use crate::player::Player;
    use crate::session::Phase;

    pub const P1: &str = "p1";
    pub const P2: &str = "p2";

    /// Create a test player whose display name is derived from the id.
    pub fn make_player(id: &str) -> Player {
        Player::new(id, format!("Player {id}"))
    }

    /// Initialize `game` with player 1 and seat player 2, returning it active.
    pub fn start_game(game: &mut dyn TownGame, seed: Option<&serde_json::Value>) {
        game.initialize(make_player(P1), seed)
            .expect("test seed must be valid");
        game.player_join(make_player(P2))
            .expect("second player must be able to join");
        assert_eq!(game.seats().phase, Phase::Active);
    }

    // ================================================================
    // Game Contract Tests
    // ================================================================
    // These functions form a generic test suite that every TownGame
    // implementation must pass. Game crates call them from their own
    // #[cfg(test)] modules with a fresh game instance.

    /// initialize() seats player 1 and waits for player 2.
    pub fn contract_initialize_waits_for_player2(game: &mut dyn TownGame) {
        game.initialize(make_player(P1), None)
            .expect("default initialize must succeed");
        let seats = game.seats();
        assert_eq!(seats.phase, Phase::WaitingForPlayer2);
        assert_eq!(seats.player1.as_ref().map(|p| p.id.as_str()), Some(P1));
        assert!(seats.player2.is_none());
        assert!(seats.winner.is_none());
        assert!(!game.is_game_over());
    }

    /// A second join is rejected with AlreadyFull whoever attempts it.
    pub fn contract_join_rejected_when_full(game: &mut dyn TownGame) {
        start_game(game, None);
        for id in [P1, P2, "p3"] {
            assert_eq!(
                game.player_join(make_player(id)),
                Err(GameError::AlreadyFull),
                "join by {id} must be rejected once full"
            );
        }
        assert_eq!(
            game.seats().player2.as_ref().map(|p| p.id.as_str()),
            Some(P2)
        );
    }

    /// Player 1 cannot take the second seat.
    pub fn contract_self_join_rejected(game: &mut dyn TownGame) {
        game.initialize(make_player(P1), None).unwrap();
        assert_eq!(game.player_join(make_player(P1)), Err(GameError::SelfJoin));
        assert_eq!(game.seats().phase, Phase::WaitingForPlayer2);
    }

    /// Moves before player 2 joins are rejected with GameNotActive.
    pub fn contract_move_before_join_rejected(
        game: &mut dyn TownGame,
        actor: &str,
        move_data: &serde_json::Value,
    ) {
        game.initialize(make_player(P1), None).unwrap();
        let before = game.serialize_state();
        assert_eq!(
            game.apply_move(actor, move_data),
            Err(GameError::GameNotActive)
        );
        assert_eq!(before, game.serialize_state());
    }

    /// A rejected move leaves the full internal state untouched. Returns the
    /// error so the caller can assert on its kind.
    pub fn contract_rejected_move_leaves_state(
        game: &mut dyn TownGame,
        actor: &str,
        move_data: &serde_json::Value,
    ) -> GameError {
        let before = game.serialize_state();
        let err = game
            .apply_move(actor, move_data)
            .expect_err("move must be rejected");
        assert_eq!(
            before,
            game.serialize_state(),
            "rejected move must not mutate state"
        );
        err
    }

    /// After the game is finished every move returns GameNotActive and
    /// neither state nor winner changes.
    pub fn contract_finished_game_rejects_moves(
        game: &mut dyn TownGame,
        actor: &str,
        move_data: &serde_json::Value,
    ) {
        assert_eq!(game.seats().phase, Phase::Finished);
        let winner = game.seats().winner.clone();
        let before = game.serialize_state();
        assert_eq!(
            game.apply_move(actor, move_data),
            Err(GameError::GameNotActive)
        );
        assert_eq!(before, game.serialize_state());
        assert_eq!(winner, game.seats().winner);
    }

    /// finish_game() is idempotent: the same summary, no further change.
    pub fn contract_finish_is_idempotent(game: &mut dyn TownGame) {
        start_game(game, None);
        let first = game.finish_game(Some(P2.to_string()));
        assert_eq!(game.seats().phase, Phase::Finished);
        assert_eq!(game.seats().winner.as_deref(), Some(P2));
        let snapshot = game.serialize_state();

        let second = game.finish_game(Some(P2.to_string()));
        assert_eq!(first, second);
        assert_eq!(snapshot, game.serialize_state());
    }
}
