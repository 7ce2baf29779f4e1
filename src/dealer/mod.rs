//! Dealer: the actor that owns the flow of a game.
//!
//! The dealer starts every player, fills the board, judges claims in the
//! order they were queued, reshuffles when the countdown expires and shuts
//! everyone down once no set is left anywhere.
//!
//! ```text
//!        ┌──────────── deal ◀──────────────┐
//!        ▼                                  │
//!   round: claims ─▶ resolve ─▶ refill      │
//!        │                                  │
//!        └─ countdown expired ─▶ reshuffle ─┘
//! ```

mod countdown;
mod standings;

pub use countdown::Countdown;
pub use standings::Standings;

use crate::arena::Arena;
use crate::board::{BoardGuard, ItemId, PlayerId, Slot};
use crate::config::{GameConfig, SET_SIZE};
use crate::error::Result;
use crate::player::{ComputerDriver, PlayerHandle, Seat, Verdict};
use crate::rules::{Solver, Validator};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable switch that ends a running game from outside the dealer.
#[derive(Debug, Clone)]
pub struct DealerStop {
    flag: Arc<AtomicBool>,
    /// Dropped on stop so a blocked dealer wakes immediately.
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl DealerStop {
    /// Ask the dealer to finish. The game ends after the claim being judged,
    /// if any.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
        drop(self.tx.lock().take());
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// The dealer actor.
pub struct Dealer<R> {
    config: GameConfig,
    arena: Arena,
    claims: Receiver<PlayerId>,
    players: Vec<PlayerHandle>,
    validator: Box<dyn Validator>,
    solver: Box<dyn Solver>,
    rng: R,
    countdown: Countdown,
    stop: DealerStop,
    stop_rx: Receiver<()>,
}

impl<R> std::fmt::Debug for Dealer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dealer")
            .field("arena", &self.arena)
            .field("players", &self.players)
            .field("countdown", &self.countdown)
            .finish_non_exhaustive()
    }
}

impl<R> Dealer<R>
where
    R: Rng + SeedableRng + Send + 'static,
{
    /// Create a dealer and one idle player per seat in `config`.
    ///
    /// `claims` is the receiving end of the board's validation queue. `rng`
    /// drives item placement and seeds every computer driver.
    pub fn new(
        config: GameConfig,
        arena: Arena,
        claims: Receiver<PlayerId>,
        validator: Box<dyn Validator>,
        solver: Box<dyn Solver>,
        rng: R,
    ) -> Self {
        let players = (0..config.players)
            .map(|id| arena.player(id, config.is_human(id)))
            .collect();
        let countdown = Countdown::new(config.turn_timeout(), config.turn_timeout_warning());
        let (stop_tx, stop_rx) = bounded(0);
        Self {
            config,
            arena,
            claims,
            players,
            validator,
            solver,
            rng,
            countdown,
            stop: DealerStop {
                flag: Arc::new(AtomicBool::new(false)),
                tx: Arc::new(Mutex::new(Some(stop_tx))),
            },
            stop_rx,
        }
    }

    /// Handle for ending the game from another thread.
    pub fn stopper(&self) -> DealerStop {
        self.stop.clone()
    }

    /// Request termination. Equivalent to `self.stopper().stop()`.
    pub fn terminate(&self) {
        self.stop.stop();
    }

    /// The seats, indexed by player id.
    pub fn seats(&self) -> Vec<Arc<Seat>> {
        self.players.iter().map(|player| Arc::clone(player.seat())).collect()
    }

    /// Current scores and leaders.
    pub fn standings(&self) -> Standings {
        Standings::from_scores(self.players.iter().map(PlayerHandle::score).collect())
    }

    /// Run the game to completion on the calling thread.
    ///
    /// Every player thread has exited by the time this returns, including
    /// on error.
    ///
    /// # Errors
    ///
    /// Returns an error if a player thread cannot be spawned or the board
    /// rejects a placement or removal.
    pub fn run(mut self) -> Result<Standings> {
        tracing::info!(players = self.players.len(), "dealer started");

        let outcome = self.start_players().and_then(|()| self.play());
        if let Err(err) = &outcome {
            tracing::error!(%err, "game aborted");
        }

        let standings = self.announce_winners();
        self.shutdown();
        tracing::info!("dealer terminated");
        outcome.map(|()| standings)
    }

    fn start_players(&mut self) -> Result<()> {
        for player in &self.players {
            player.start()?;
            if !player.seat().is_human() {
                let rng = R::from_rng(&mut self.rng);
                player.attach_driver(ComputerDriver::new(self.config.computer_pace(), rng))?;
            }
        }
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        while !self.should_finish() {
            self.deal()?;
            if self.should_finish() {
                break;
            }
            if self.run_round()? || self.is_stopped() {
                break;
            }
            self.reshuffle()?;
        }
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Whether the game is over: stopped, or no set left among the items in
    /// the pile and on the board.
    pub fn should_finish(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        let items = self.arena.board.lock().items_in_play();
        !self.solver.has_set(&items)
    }

    fn deal(&mut self) -> Result<()> {
        let board = Arc::clone(&self.arena.board);
        let mut guard = board.lock();
        self.refill(&mut guard)
    }

    /// Fill every empty slot, re-dealing while the board holds no set but
    /// the pile could still provide one. Opens the round on return.
    fn refill(&mut self, board: &mut BoardGuard<'_>) -> Result<()> {
        self.arena.gate.close();

        let attempts = board.draw_pile().len() + 1;
        for attempt in 1..=attempts {
            self.place_random(board)?;
            if board.draw_pile().is_empty()
                || self.solver.has_set(&board.placed_items())
                || !self.solver.has_set(&board.items_in_play())
            {
                break;
            }
            tracing::debug!(attempt, "no set on the board, dealing again");
            let occupied = board.occupied_slots();
            self.vacate(board, &occupied, false)?;
        }

        if self.config.hints {
            for hint in board.hints(self.solver.as_ref()) {
                tracing::info!(slots = ?hint.slots, items = ?hint.items, "hint");
            }
        }
        tracing::debug!(
            placed = board.count_placed(),
            pile = board.draw_pile().len(),
            "board dealt"
        );

        self.countdown.reset();
        self.arena.sink.countdown(self.countdown.remaining(), false);
        self.arena.gate.open();
        self.arena.round.broadcast();
        Ok(())
    }

    fn place_random(&mut self, board: &mut BoardGuard<'_>) -> Result<()> {
        loop {
            let empty = board.empty_slots();
            let pile = board.draw_pile().len();
            if empty.is_empty() || pile == 0 {
                return Ok(());
            }
            let slot = empty[self.rng.random_range(0..empty.len())];
            let item = board.draw_pile()[self.rng.random_range(0..pile)];
            board.place_item(slot, item)?;
        }
    }

    /// Remove the items on `slots` and forget every request aimed at them.
    fn vacate(&self, board: &mut BoardGuard<'_>, slots: &[Slot], retire: bool) -> Result<()> {
        for &slot in slots {
            board.remove_item(slot, retire)?;
        }
        for player in &self.players {
            player.seat().scrub(slots);
        }
        Ok(())
    }

    /// Judge claims until the countdown expires or a stop is requested.
    ///
    /// Returns `true` if a scored claim left no set in the pile and on the
    /// board, which ends the game at once.
    fn run_round(&mut self) -> Result<bool> {
        while !self.is_stopped() && !self.countdown.is_expired() {
            let wait = self.countdown.poll_interval();
            let claim = select! {
                recv(self.claims) -> player => player.ok(),
                recv(self.stop_rx) -> _ => None,
                default(wait) => None,
            };
            if let Some(player) = claim {
                if self.resolve(player)? == Verdict::Scored && self.should_finish() {
                    tracing::info!(player, "last set claimed");
                    return Ok(true);
                }
            }
            self.arena
                .sink
                .countdown(self.countdown.remaining(), self.countdown.is_urgent());
        }
        Ok(false)
    }

    /// Judge the claim queued by `player` and deliver exactly one verdict.
    fn resolve(&mut self, player: PlayerId) -> Result<Verdict> {
        let Some(seat) = self.players.get(player).map(|p| Arc::clone(p.seat())) else {
            tracing::warn!(player, "claim from unknown player");
            return Ok(Verdict::Stale);
        };
        let judged = self.judge(&seat);
        seat.deliver(judged.as_ref().copied().unwrap_or(Verdict::Stale));
        judged
    }

    fn judge(&mut self, seat: &Seat) -> Result<Verdict> {
        let board = Arc::clone(&self.arena.board);
        let mut guard = board.lock();

        let slots = guard.claims(seat.id()).to_vec();
        let items: Option<Vec<ItemId>> = slots.iter().map(|&slot| guard.item_at(slot)).collect();
        let Some(items) = items.filter(|_| slots.len() == SET_SIZE) else {
            tracing::debug!(player = seat.id(), ?slots, "stale claim");
            return Ok(Verdict::Stale);
        };

        if self.validator.is_valid_set(&items) {
            self.arena.gate.close();
            let score = seat.award();
            seat.set_freeze(self.config.point_freeze());
            tracing::info!(player = seat.id(), ?slots, ?items, score, "set claimed");
            self.vacate(&mut guard, &slots, true)?;
            self.refill(&mut guard)?;
            Ok(Verdict::Scored)
        } else {
            seat.set_freeze(self.config.penalty_freeze());
            guard.clear_claims(seat.id());
            tracing::info!(player = seat.id(), ?slots, ?items, "invalid claim");
            Ok(Verdict::Penalized)
        }
    }

    /// Return every item on the board to the pile.
    fn reshuffle(&mut self) -> Result<()> {
        let board = Arc::clone(&self.arena.board);
        let mut guard = board.lock();
        self.arena.gate.close();
        let occupied = guard.occupied_slots();
        tracing::info!(slots = occupied.len(), "countdown expired, reshuffling");
        self.vacate(&mut guard, &occupied, false)
    }

    fn announce_winners(&self) -> Standings {
        let standings = self.standings();
        for (player, score) in standings.scores().iter().enumerate() {
            tracing::info!(player, score, "final score");
        }
        tracing::info!(winners = ?standings.winners(), "game over");
        self.arena.sink.winners(standings.winners());
        standings
    }

    /// Stop every player, answer claims still queued and join the threads
    /// in reverse start order.
    fn shutdown(&mut self) {
        self.arena.gate.close();
        {
            // no toggle may complete a triple once the seats are halted
            let _board = self.arena.board.lock();
            for player in &self.players {
                player.seat().halt();
            }
        }
        while let Ok(player) = self.claims.try_recv() {
            if let Some(handle) = self.players.get(player) {
                handle.seat().deliver(Verdict::Stale);
            }
        }

        let mut order = self.arena.board.start_order();
        for player in &self.players {
            if !order.contains(&player.id()) {
                order.insert(0, player.id());
            }
        }
        for id in order.into_iter().rev() {
            if let Some(player) = self.players.get(id) {
                player.terminate();
                tracing::debug!(player = id, "player joined");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{ClaimOutcome, Placement};
    use crate::player::PlayerState;
    use crate::rules::CardRules;
    use crate::sink::NullSink;
    use rand::rngs::StdRng;
    use std::thread;
    use std::time::{Duration, Instant};

    fn config(players: usize) -> GameConfig {
        GameConfig {
            players,
            human_players: players,
            table_delay_ms: 0,
            ..GameConfig::default()
        }
    }

    fn dealer(config: GameConfig) -> Dealer<StdRng> {
        let (arena, claims) = Arena::new(&config, Arc::new(NullSink));
        let rules = CardRules::from_config(&config);
        Dealer::new(
            config,
            arena,
            claims,
            Box::new(rules),
            Box::new(rules),
            StdRng::seed_from_u64(3),
        )
    }

    /// Have `player` claim every slot in `slots` and pop the queued claim.
    fn claim(dealer: &Dealer<StdRng>, player: PlayerId, slots: &[Slot]) -> PlayerId {
        let board = &dealer.arena.board;
        let mut last = ClaimOutcome::NoOp;
        for &slot in slots {
            last = board.toggle_claim(player, slot);
        }
        assert_eq!(last, ClaimOutcome::CompletedTriple);
        dealer.claims.try_recv().unwrap()
    }

    fn place(dealer: &Dealer<StdRng>, placements: &[(Slot, ItemId)]) {
        for &(slot, item) in placements {
            dealer.arena.board.place_item(slot, item).unwrap();
        }
    }

    #[test]
    fn test_deal_fills_board_and_opens_round() {
        let mut d = dealer(config(2));
        d.deal().unwrap();

        let board = d.arena.board.lock();
        assert_eq!(board.count_placed(), 12);
        assert_eq!(board.draw_pile().len(), 69);
        assert!(d.solver.has_set(&board.placed_items()));
        assert!(board.verify().is_ok());
        drop(board);

        assert!(d.arena.gate.is_open());
        assert_eq!(d.arena.round.generation(), 1);
    }

    #[test]
    fn test_valid_claim_scores_and_refills() {
        let mut d = dealer(config(2));
        place(&d, &[(2, 0), (5, 1), (9, 2)]);
        let player = claim(&d, 0, &[2, 5, 9]);

        d.resolve(player).unwrap();

        let seat = d.seats()[0].clone();
        assert_eq!(seat.take_verdict(), Some(Verdict::Scored));
        assert_eq!(seat.score(), 1);
        assert_eq!(seat.freeze(), Duration::from_millis(1000));

        let board = d.arena.board.lock();
        for item in 0..3 {
            assert_eq!(board.placement(item), Some(Placement::Retired));
        }
        assert_eq!(board.count_placed(), 12);
        assert!(board.claims(0).is_empty());
        drop(board);
        assert!(d.arena.gate.is_open());
    }

    #[test]
    fn test_last_set_leaves_board_empty() {
        let mut d = dealer(GameConfig {
            feature_count: 1,
            ..config(1)
        });
        place(&d, &[(2, 0), (5, 1), (9, 2)]);
        let player = claim(&d, 0, &[2, 5, 9]);

        d.resolve(player).unwrap();

        assert_eq!(d.seats()[0].take_verdict(), Some(Verdict::Scored));
        assert_eq!(d.arena.board.count_placed(), 0);
        assert!(d.should_finish());
    }

    #[test]
    fn test_last_set_claimed_ends_round() {
        let mut d = dealer(GameConfig {
            feature_count: 1,
            ..config(1)
        });
        d.deal().unwrap();
        let occupied = d.arena.board.lock().occupied_slots();
        assert_eq!(occupied.len(), 3);
        for &slot in &occupied {
            d.arena.board.toggle_claim(0, slot);
        }

        assert!(d.run_round().unwrap());
        assert_eq!(d.seats()[0].take_verdict(), Some(Verdict::Scored));
        assert_eq!(d.arena.board.count_placed(), 0);
        assert!(!d.countdown.is_expired());
    }

    #[test]
    fn test_repeated_game_over_is_stable() {
        let mut d = dealer(config(2));
        place(&d, &[(2, 0), (5, 1), (9, 2)]);
        let player = claim(&d, 1, &[2, 5, 9]);
        assert_eq!(d.resolve(player).unwrap(), Verdict::Scored);

        let first = d.announce_winners();
        d.shutdown();
        d.shutdown();
        let second = d.announce_winners();
        assert_eq!(first, second);
        assert_eq!(second.scores(), &[0, 1]);
        assert_eq!(second.winners(), &[1]);
    }

    #[test]
    fn test_invalid_claim_penalized() {
        let mut d = dealer(config(2));
        place(&d, &[(0, 0), (1, 1), (2, 3)]);
        let player = claim(&d, 1, &[0, 1, 2]);

        d.resolve(player).unwrap();

        let seat = d.seats()[1].clone();
        assert_eq!(seat.take_verdict(), Some(Verdict::Penalized));
        assert_eq!(seat.score(), 0);
        assert_eq!(seat.freeze(), Duration::from_millis(3000));
        assert!(d.arena.board.claims(1).is_empty());
        assert_eq!(d.arena.board.count_placed(), 3);
    }

    #[test]
    fn test_overlapping_claims_resolve_once() {
        let mut d = dealer(config(2));
        place(&d, &[(2, 0), (5, 1), (9, 2)]);
        let first = claim(&d, 0, &[2, 5, 9]);
        let second = claim(&d, 1, &[2, 5, 9]);

        d.resolve(first).unwrap();
        d.resolve(second).unwrap();

        let seats = d.seats();
        assert_eq!(seats[0].take_verdict(), Some(Verdict::Scored));
        assert_eq!(seats[1].take_verdict(), Some(Verdict::Stale));
        assert_eq!(d.standings().scores(), &[1, 0]);
    }

    #[test]
    fn test_reshuffle_returns_items_to_pile() {
        let mut d = dealer(config(1));
        d.deal().unwrap();
        d.reshuffle().unwrap();

        let board = d.arena.board.lock();
        assert_eq!(board.count_placed(), 0);
        assert_eq!(board.draw_pile().len(), 81);
        drop(board);
        assert!(!d.arena.gate.is_open());
    }

    #[test]
    fn test_game_over_without_sets() {
        let d = dealer(GameConfig {
            deck_size: Some(2),
            ..config(1)
        });
        assert!(d.should_finish());

        let standings = d.run().unwrap();
        assert_eq!(standings.scores(), &[0]);
        assert_eq!(standings.winners(), &[0]);
    }

    #[test]
    fn test_stop_before_run_joins_players() {
        let d = dealer(GameConfig {
            human_players: 1,
            ..config(3)
        });
        let seats = d.seats();
        d.terminate();

        let standings = d.run().unwrap();
        assert_eq!(standings.winners(), &[0, 1, 2]);
        for seat in seats {
            assert_eq!(seat.state(), PlayerState::Terminated);
        }
    }

    #[test]
    fn test_players_terminated_newest_first() {
        let d = dealer(config(3));
        let board = Arc::clone(&d.arena.board);
        let seats = d.seats();
        let stop = d.stopper();
        let dealer = thread::spawn(move || d.run());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !seats.iter().all(|seat| seat.is_accepting()) {
            assert!(Instant::now() < deadline, "players never joined the round");
            thread::sleep(Duration::from_millis(1));
        }
        // let every player settle into its request loop
        thread::sleep(Duration::from_millis(50));
        stop.stop();
        dealer.join().unwrap().unwrap();

        let mut newest_first = board.start_order();
        newest_first.reverse();
        assert_eq!(newest_first.len(), 3);
        assert_eq!(board.exit_order(), newest_first);
    }
}
