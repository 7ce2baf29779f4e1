//! Gates that pace the players: the global input gate and the round-ready
//! signal.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Global accept-input gate.
///
/// Closed by the dealer while the board is being rebuilt, open during play.
/// Slot requests made while it is closed are ignored. Only the dealer writes
/// it; everyone reads it.
#[derive(Debug, Default)]
pub struct InputGate {
    open: AtomicBool,
}

impl InputGate {
    /// A closed gate.
    pub const fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
        }
    }

    /// Let requests through.
    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    /// Stop requests.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Whether requests are currently accepted.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// Broadcast signal that a round is ready.
///
/// Player actors park here after startup until the dealer's first fill.
/// Every broadcast bumps a generation counter, so a waiter can never miss a
/// broadcast that happened before it started waiting.
#[derive(Debug, Default)]
pub struct RoundSignal {
    generation: Mutex<u64>,
    ready: Condvar,
}

impl RoundSignal {
    /// A signal that has never been broadcast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake every waiter: a new round is on the board.
    pub fn broadcast(&self) {
        *self.generation.lock() += 1;
        self.ready.notify_all();
    }

    /// Number of broadcasts so far.
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Block until at least one round has been broadcast or `cancelled`
    /// returns true. Returns `true` if a round is ready.
    ///
    /// `cancelled` is evaluated under the signal's lock; whoever flips it must
    /// call [`RoundSignal::interrupt`] afterwards.
    pub fn wait_ready(&self, cancelled: impl Fn() -> bool) -> bool {
        let mut generation = self.generation.lock();
        loop {
            if cancelled() {
                return false;
            }
            if *generation > 0 {
                return true;
            }
            self.ready.wait(&mut generation);
        }
    }

    /// Wake every waiter so it re-checks its cancellation condition.
    pub fn interrupt(&self) {
        drop(self.generation.lock());
        self.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_gate_starts_closed() {
        let gate = InputGate::new();
        assert!(!gate.is_open());
        gate.open();
        assert!(gate.is_open());
        gate.close();
        assert!(!gate.is_open());
    }

    #[test]
    fn test_broadcast_before_wait_is_not_lost() {
        let signal = RoundSignal::new();
        signal.broadcast();
        assert!(signal.wait_ready(|| false));
        assert_eq!(signal.generation(), 1);
    }

    #[test]
    fn test_broadcast_wakes_waiter() {
        let signal = Arc::new(RoundSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait_ready(|| false))
        };

        thread::sleep(Duration::from_millis(20));
        signal.broadcast();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_interrupt_cancels_waiter() {
        let signal = Arc::new(RoundSignal::new());
        let stop = Arc::new(AtomicBool::new(false));
        let waiter = {
            let signal = Arc::clone(&signal);
            let stop = Arc::clone(&stop);
            thread::spawn(move || signal.wait_ready(|| stop.load(Ordering::Acquire)))
        };

        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::Release);
        signal.interrupt();
        assert!(!waiter.join().unwrap());
    }
}
