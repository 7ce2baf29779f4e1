//! Seat: the state of one player actor and its main loop.
//!
//! A seat is shared between the player thread (which runs the loop), its
//! input source (which calls [`Seat::request_slot`]) and the dealer (which
//! writes the freeze, awards points and delivers verdicts).

use super::messages::{PlayerState, PlayerStats, Verdict};
use crate::board::{Board, ClaimOutcome, InputGate, PlayerId, RoundSignal, Slot, SlotRequest};
use crate::config::SET_SIZE;
use crate::sink::Sink;
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Granularity of freeze reporting.
const FREEZE_STEP: Duration = Duration::from_secs(1);

/// Shared state of one player actor.
pub struct Seat {
    id: PlayerId,
    human: bool,
    board: Arc<Board>,
    gate: Arc<InputGate>,
    sink: Arc<dyn Sink>,
    requests_tx: Sender<SlotRequest>,
    pub(super) requests_rx: Receiver<SlotRequest>,
    verdict_tx: Sender<Verdict>,
    verdict_rx: Receiver<Verdict>,
    /// Never carries a message; disconnects when the player is terminated.
    stop_rx: Receiver<()>,
    stopped: AtomicBool,
    pub(super) accepting: AtomicBool,
    pending: Mutex<Option<SlotRequest>>,
    freeze_ms: AtomicU64,
    score: AtomicU32,
    state: AtomicU8,
    claims: AtomicU64,
    verdicts: AtomicU64,
}

impl std::fmt::Debug for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seat")
            .field("id", &self.id)
            .field("human", &self.human)
            .field("state", &self.state())
            .field("score", &self.score())
            .finish_non_exhaustive()
    }
}

impl Seat {
    pub(crate) fn new(
        id: PlayerId,
        human: bool,
        board: Arc<Board>,
        gate: Arc<InputGate>,
        sink: Arc<dyn Sink>,
        stop_rx: Receiver<()>,
    ) -> Self {
        let (requests_tx, requests_rx) = bounded(SET_SIZE);
        let (verdict_tx, verdict_rx) = bounded(1);
        Self {
            id,
            human,
            board,
            gate,
            sink,
            requests_tx,
            requests_rx,
            verdict_tx,
            verdict_rx,
            stop_rx,
            stopped: AtomicBool::new(false),
            accepting: AtomicBool::new(false),
            pending: Mutex::new(None),
            freeze_ms: AtomicU64::new(0),
            score: AtomicU32::new(0),
            state: AtomicU8::new(PlayerState::Created as u8),
            claims: AtomicU64::new(0),
            verdicts: AtomicU64::new(0),
        }
    }

    /// Player id.
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Whether this seat takes external input rather than a computer driver.
    pub const fn is_human(&self) -> bool {
        self.human
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.score.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlayerState {
        PlayerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Claims submitted and verdicts received so far.
    pub fn stats(&self) -> PlayerStats {
        PlayerStats {
            claims: self.claims.load(Ordering::Acquire),
            verdicts: self.verdicts.load(Ordering::Acquire),
        }
    }

    /// Freeze the player will serve after its current claim.
    pub fn freeze(&self) -> Duration {
        Duration::from_millis(self.freeze_ms.load(Ordering::Acquire))
    }

    /// Whether the player currently takes slot requests.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Ask this player to toggle a token on `slot`.
    ///
    /// Ignored (returns `false`) unless the player accepts input, the global
    /// gate is open and the slot is occupied. Blocks while the request queue
    /// is full, until there is room or the player is terminated.
    pub fn request_slot(&self, slot: Slot) -> bool {
        if self.is_stopped() || !self.is_accepting() || !self.gate.is_open() {
            return false;
        }
        let Some(request) = self.board.request_for(slot) else {
            return false;
        };
        select! {
            send(self.requests_tx, request) -> sent => sent.is_ok(),
            recv(self.stop_rx) -> _ => false,
        }
    }

    pub(crate) fn set_freeze(&self, freeze: Duration) {
        let millis = u64::try_from(freeze.as_millis()).unwrap_or(u64::MAX);
        self.freeze_ms.store(millis, Ordering::Release);
    }

    pub(crate) fn award(&self) -> u32 {
        let score = self.score.fetch_add(1, Ordering::AcqRel) + 1;
        self.sink.score(self.id, score);
        score
    }

    pub(crate) fn deliver(&self, verdict: Verdict) {
        if let Err(err) = self.verdict_tx.try_send(verdict) {
            tracing::warn!(player = self.id, ?verdict, %err, "verdict not delivered");
        }
    }

    /// Drop the in-flight request if it targets a vacated slot. Call with
    /// the board lock held.
    ///
    /// Queued requests are left in place; their generation stamp no longer
    /// matches, so the player discards them when it dequeues them.
    pub(crate) fn scrub(&self, slots: &[Slot]) {
        let mut pending = self.pending.lock();
        if pending.is_some_and(|request| slots.contains(&request.slot)) {
            *pending = None;
        }
    }

    #[cfg(test)]
    pub(crate) fn take_verdict(&self) -> Option<Verdict> {
        self.verdict_rx.try_recv().ok()
    }

    /// Stop taking new claims. The thread keeps running until interrupted.
    pub(crate) fn halt(&self) {
        self.stopped.store(true, Ordering::Release);
        self.accepting.store(false, Ordering::Release);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Sleep for `wait` unless stopped first. Returns `true` if stopped.
    pub(crate) fn interrupted_after(&self, wait: Duration) -> bool {
        match self.stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => self.is_stopped(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }

    pub(crate) fn table_size(&self) -> usize {
        self.board.table_size()
    }

    fn set_state(&self, state: PlayerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Player thread body.
    pub(crate) fn run(&self, round: &RoundSignal) {
        self.board.register_start(self.id);
        tracing::info!(player = self.id, human = self.human, "player started");

        self.set_state(PlayerState::AwaitingRoundStart);
        if round.wait_ready(|| self.is_stopped()) {
            self.accepting.store(true, Ordering::Release);
            self.set_state(PlayerState::Idle);
            self.play();
        }

        self.accepting.store(false, Ordering::Release);
        self.board.register_exit(self.id);
        self.set_state(PlayerState::Terminated);
        tracing::info!(player = self.id, score = self.score(), "player terminated");
    }

    fn play(&self) {
        while !self.is_stopped() {
            let request = select! {
                recv(self.requests_rx) -> request => match request {
                    Ok(request) => request,
                    Err(_) => return,
                },
                recv(self.stop_rx) -> _ => return,
            };
            *self.pending.lock() = Some(request);

            let outcome = {
                let mut board = self.board.lock();
                match self.pending.lock().take() {
                    Some(request) if board.request_for(request.slot) != Some(request) => {
                        tracing::debug!(player = self.id, slot = request.slot, "request for vacated slot dropped");
                        ClaimOutcome::NoOp
                    }
                    Some(request) if !self.is_stopped() => board.toggle_request(self.id, request),
                    _ => ClaimOutcome::NoOp,
                }
            };
            tracing::trace!(player = self.id, slot = request.slot, ?outcome, "toggle");

            if outcome == ClaimOutcome::CompletedTriple {
                self.accepting.store(false, Ordering::Release);
                self.set_state(PlayerState::AwaitingVerdict);
                self.claims.fetch_add(1, Ordering::AcqRel);
                match self.await_verdict() {
                    Some(verdict) => tracing::debug!(player = self.id, ?verdict, "verdict received"),
                    None => return,
                }
            }

            if !self.freeze().is_zero() {
                self.set_state(PlayerState::ServingFreeze);
                if !self.serve_freeze() {
                    return;
                }
            }
            self.accepting.store(true, Ordering::Release);
            self.set_state(PlayerState::Idle);
        }
    }

    fn await_verdict(&self) -> Option<Verdict> {
        let verdict = select! {
            recv(self.verdict_rx) -> verdict => verdict.ok(),
            recv(self.stop_rx) -> _ => self.verdict_rx.try_recv().ok(),
        };
        if verdict.is_some() {
            self.verdicts.fetch_add(1, Ordering::AcqRel);
        }
        verdict
    }

    /// Sit out the current freeze, reporting the remaining time once per
    /// step. Returns `false` if interrupted.
    fn serve_freeze(&self) -> bool {
        let mut remaining = self.freeze();
        while !remaining.is_zero() {
            self.sink.freeze(self.id, remaining);
            let step = remaining.min(FREEZE_STEP);
            if self.interrupted_after(step) {
                return false;
            }
            remaining -= step;
        }
        self.freeze_ms.store(0, Ordering::Release);
        self.sink.freeze(self.id, Duration::ZERO);
        true
    }
}
