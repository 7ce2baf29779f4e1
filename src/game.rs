//! Game: wiring of board, players and dealer behind one handle.
//!
//! [`GameBuilder::start`] validates the configuration, builds the arena and
//! runs the dealer on its own thread. The returned [`GameHandle`] feeds
//! human input to the seats and collects the final [`Standings`].

use crate::arena::Arena;
use crate::board::{Board, PlayerId, Slot};
use crate::config::GameConfig;
use crate::dealer::{Dealer, DealerStop, Standings};
use crate::error::{GameError, Result};
use crate::player::Seat;
use crate::rules::{CardRules, Solver, Validator};
use crate::sink::{NullSink, Sink};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Builder for a game.
pub struct GameBuilder {
    config: GameConfig,
    sink: Arc<dyn Sink>,
    validator: Option<Box<dyn Validator>>,
    solver: Option<Box<dyn Solver>>,
}

impl GameBuilder {
    /// Start from `config` with the standard card rules and no presentation.
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            sink: Arc::new(NullSink),
            validator: None,
            solver: None,
        }
    }

    /// Send presentation notices to `sink`.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the triple validator.
    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Replace the set finder used for refills, hints and game over.
    #[must_use]
    pub fn solver(mut self, solver: impl Solver + 'static) -> Self {
        self.solver = Some(Box::new(solver));
        self
    }

    /// Validate the configuration and start the dealer thread.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] for an unplayable configuration and
    /// [`GameError::Spawn`] if the dealer thread cannot be started.
    pub fn start(self) -> Result<GameHandle> {
        self.config.validate()?;

        let rules = CardRules::from_config(&self.config);
        let validator = self.validator.unwrap_or_else(|| Box::new(rules));
        let solver = self.solver.unwrap_or_else(|| Box::new(rules));
        let rng = self
            .config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        let (arena, claims) = Arena::new(&self.config, self.sink);
        let board = Arc::clone(&arena.board);
        let dealer = Dealer::new(self.config, arena, claims, validator, solver, rng);
        let seats = dealer.seats();
        let stop = dealer.stopper();

        let name = "dealer".to_string();
        let dealer_thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || dealer.run())
            .map_err(|source| GameError::Spawn { name, source })?;
        tracing::debug!(players = seats.len(), "game started");

        Ok(GameHandle {
            board,
            seats,
            stop,
            dealer_thread: Some(dealer_thread),
        })
    }
}

impl std::fmt::Debug for GameBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameBuilder").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Handle to a running game.
///
/// Dropping the handle stops the game and waits for every thread.
#[derive(Debug)]
pub struct GameHandle {
    board: Arc<Board>,
    seats: Vec<Arc<Seat>>,
    stop: DealerStop,
    dealer_thread: Option<JoinHandle<Result<Standings>>>,
}

impl GameHandle {
    /// The shared board.
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    /// The seats, indexed by player id.
    pub fn seats(&self) -> &[Arc<Seat>] {
        &self.seats
    }

    /// Forward a slot request to `player`. Returns `false` if it was ignored.
    pub fn request_slot(&self, player: PlayerId, slot: Slot) -> bool {
        self.seats
            .get(player)
            .is_some_and(|seat| seat.request_slot(slot))
    }

    /// Current scores, indexed by player id.
    pub fn scores(&self) -> Vec<u32> {
        self.seats.iter().map(|seat| seat.score()).collect()
    }

    /// Cloneable stop switch, for input threads.
    pub fn stopper(&self) -> DealerStop {
        self.stop.clone()
    }

    /// Ask the game to end. Use [`GameHandle::join`] to wait for it.
    pub fn terminate(&self) {
        self.stop.stop();
    }

    /// Whether the dealer has exited.
    pub fn is_finished(&self) -> bool {
        self.dealer_thread
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the game to end and return the final standings.
    ///
    /// # Errors
    ///
    /// Returns the dealer's error, or [`GameError::DealerPanicked`].
    pub fn join(mut self) -> Result<Standings> {
        self.wait()
    }

    fn wait(&mut self) -> Result<Standings> {
        match self.dealer_thread.take() {
            Some(handle) => handle.join().map_err(|_| GameError::DealerPanicked)?,
            None => Ok(Standings::from_scores(self.scores())),
        }
    }
}

impl Drop for GameHandle {
    fn drop(&mut self) {
        if self.dealer_thread.is_some() {
            self.terminate();
            if let Err(err) = self.wait() {
                tracing::error!(%err, "game ended with an error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Placement;
    use crate::config::ConfigError;
    use crate::player::PlayerState;
    use std::time::{Duration, Instant};

    fn quick(players: usize, humans: usize) -> GameConfig {
        GameConfig {
            players,
            human_players: humans,
            table_delay_ms: 0,
            point_freeze_ms: 0,
            penalty_freeze_ms: 0,
            computer_pace_ms: 1,
            turn_timeout_ms: 200,
            turn_timeout_warning_ms: 50,
            seed: Some(11),
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameConfig {
            players: 0,
            ..GameConfig::default()
        };
        let err = GameBuilder::new(config).start().unwrap_err();
        assert!(matches!(err, GameError::Config(ConfigError::NoPlayers)));
    }

    #[test]
    fn test_game_without_sets_ends_at_once() {
        let config = GameConfig {
            deck_size: Some(2),
            ..quick(2, 0)
        };
        let game = GameBuilder::new(config).start().unwrap();
        let standings = game.join().unwrap();
        assert_eq!(standings.scores(), &[0, 0]);
        assert_eq!(standings.winners(), &[0, 1]);
    }

    #[test]
    fn test_terminate_idle_humans() {
        let game = GameBuilder::new(quick(2, 2)).start().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!game.is_finished());
        assert!(!game.request_slot(7, 0));

        game.terminate();
        let seats = game.seats().to_vec();
        let standings = game.join().unwrap();
        assert_eq!(standings.winners(), &[0, 1]);
        for seat in seats {
            assert_eq!(seat.state(), PlayerState::Terminated);
        }
    }

    #[test]
    fn test_computer_players_stay_consistent() {
        let config = quick(4, 0);
        let deck = config.deck_len();
        let game = GameBuilder::new(config).start().unwrap();
        thread::sleep(Duration::from_millis(500));
        game.terminate();

        let board = Arc::clone(game.board());
        let seats = game.seats().to_vec();
        let standings = game.join().unwrap();

        for seat in &seats {
            let stats = seat.stats();
            assert_eq!(stats.claims, stats.verdicts, "player {}", seat.id());
            assert_eq!(seat.state(), PlayerState::Terminated);
        }

        let guard = board.lock();
        assert!(guard.verify().is_ok());
        let retired = (0..deck)
            .filter(|&item| guard.placement(item) == Some(Placement::Retired))
            .count();
        let total: u32 = standings.scores().iter().sum();
        assert_eq!(retired, 3 * total as usize);
        drop(guard);

        let scores: Vec<u32> = seats.iter().map(|seat| seat.score()).collect();
        assert_eq!(standings.scores(), scores.as_slice());
        let best = scores.iter().copied().max().unwrap_or(0);
        for &winner in standings.winners() {
            assert_eq!(scores[winner], best);
        }
    }

    #[test]
    fn test_last_set_ends_game_without_timeout() {
        let config = GameConfig {
            feature_count: 1,
            turn_timeout_ms: 20_000,
            ..quick(1, 1)
        };
        let game = GameBuilder::new(config).start().unwrap();
        let seat = Arc::clone(&game.seats()[0]);

        let deadline = Instant::now() + Duration::from_secs(5);
        while game.board().count_placed() < 3 || !seat.is_accepting() {
            assert!(Instant::now() < deadline, "round never opened");
            thread::sleep(Duration::from_millis(1));
        }
        let occupied = game.board().lock().occupied_slots();
        assert_eq!(occupied.len(), 3);
        for slot in occupied {
            assert!(game.request_slot(0, slot));
        }

        let deadline = Instant::now() + Duration::from_secs(2);
        while !game.is_finished() {
            assert!(Instant::now() < deadline, "game still running after the last set");
            thread::sleep(Duration::from_millis(5));
        }
        let standings = game.join().unwrap();
        assert_eq!(standings.scores(), &[1]);
        assert_eq!(standings.winners(), &[0]);
        assert_eq!(seat.state(), PlayerState::Terminated);
        assert_eq!(seat.stats().verdicts, 1);
    }
}
