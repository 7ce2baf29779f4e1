//! Player Actor: owns the player thread and, for computer seats, the input
//! driver thread.

use super::driver::ComputerDriver;
use super::messages::{PlayerState, PlayerStats};
use super::seat::Seat;
use crate::board::{Board, InputGate, PlayerId, RoundSignal};
use crate::error::{GameError, Result};
use crate::sink::Sink;
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Handle to one player actor.
///
/// Created idle; [`PlayerHandle::start`] spawns the thread and
/// [`PlayerHandle::terminate`] interrupts and joins it.
pub struct PlayerHandle {
    seat: Arc<Seat>,
    round: Arc<RoundSignal>,
    /// Dropped on terminate to interrupt every blocking wait.
    stop_tx: Mutex<Option<Sender<()>>>,
    player_thread: Mutex<Option<JoinHandle<()>>>,
    driver_thread: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerHandle {
    /// Create a player for seat `id`.
    pub fn new(
        id: PlayerId,
        human: bool,
        board: Arc<Board>,
        gate: Arc<InputGate>,
        round: Arc<RoundSignal>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let (stop_tx, stop_rx) = bounded(0);
        let seat = Seat::new(id, human, board, gate, sink, stop_rx);
        Self {
            seat: Arc::new(seat),
            round,
            stop_tx: Mutex::new(Some(stop_tx)),
            player_thread: Mutex::new(None),
            driver_thread: Mutex::new(None),
        }
    }

    /// Shared seat state, for input sources and observers.
    pub fn seat(&self) -> &Arc<Seat> {
        &self.seat
    }

    /// Player id.
    pub fn id(&self) -> PlayerId {
        self.seat.id()
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.seat.score()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlayerState {
        self.seat.state()
    }

    /// Claims submitted and verdicts received.
    pub fn stats(&self) -> PlayerStats {
        self.seat.stats()
    }

    /// Spawn the player thread.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Spawn`] if the OS refuses the thread.
    pub fn start(&self) -> Result<()> {
        let name = format!("player-{}", self.id());
        let seat = Arc::clone(&self.seat);
        let round = Arc::clone(&self.round);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || seat.run(&round))
            .map_err(|source| GameError::Spawn { name, source })?;
        *self.player_thread.lock() = Some(handle);
        Ok(())
    }

    /// Spawn a computer driver feeding this player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Spawn`] if the OS refuses the thread.
    pub fn attach_driver<R>(&self, driver: ComputerDriver<R>) -> Result<()>
    where
        R: Rng + Send + 'static,
    {
        let name = format!("computer-{}", self.id());
        let seat = Arc::clone(&self.seat);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || driver.run(&seat))
            .map_err(|source| GameError::Spawn { name, source })?;
        *self.driver_thread.lock() = Some(handle);
        Ok(())
    }

    /// Stop the player and wait for its threads to exit.
    ///
    /// Works from any suspension point: waiting for the round, for a
    /// request, for a verdict, or mid-freeze. Calling it again is a no-op.
    pub fn terminate(&self) {
        self.seat.halt();
        drop(self.stop_tx.lock().take());
        self.round.interrupt();

        if let Some(handle) = self.driver_thread.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.player_thread.lock().take() {
            if handle.join().is_err() {
                tracing::error!(player = self.id(), "player thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle").field("seat", &self.seat).finish_non_exhaustive()
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}
