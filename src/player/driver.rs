//! Computer Driver: automated input for a non-interactive seat.
//!
//! Picks a uniformly random slot at a fixed pace and requests it. Purely a
//! producer; all decisions are the board's.

use super::seat::Seat;
use rand::Rng;
use std::thread;
use std::time::Duration;

/// Random slot generator feeding one player.
#[derive(Debug)]
pub struct ComputerDriver<R> {
    pace: Duration,
    rng: R,
}

impl<R: Rng> ComputerDriver<R> {
    /// Request a slot every `pace`, drawing slots from `rng`.
    pub const fn new(pace: Duration, rng: R) -> Self {
        Self { pace, rng }
    }

    /// Pick the next slot to request.
    pub fn next_slot(&mut self, slots: usize) -> usize {
        self.rng.random_range(0..slots.max(1))
    }

    pub(crate) fn run(mut self, seat: &Seat) {
        tracing::info!(player = seat.id(), "computer driver started");
        let slots = seat.table_size();
        while !seat.is_stopped() {
            if self.pace.is_zero() {
                thread::yield_now();
            } else if seat.interrupted_after(self.pace) {
                break;
            }
            let slot = self.next_slot(slots);
            seat.request_slot(slot);
        }
        tracing::info!(player = seat.id(), "computer driver terminated");
    }
}
