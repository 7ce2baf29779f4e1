//! Arena: the shared coordination objects every actor holds a reference to.

use crate::board::{Board, InputGate, PlayerId, RoundSignal};
use crate::config::GameConfig;
use crate::player::PlayerHandle;
use crate::sink::Sink;
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// Board, gates and presentation sink of one game.
#[derive(Clone)]
pub struct Arena {
    /// The shared board.
    pub board: Arc<Board>,
    /// Global accept-input gate.
    pub gate: Arc<InputGate>,
    /// Round-ready broadcast.
    pub round: Arc<RoundSignal>,
    /// Presentation sink.
    pub sink: Arc<dyn Sink>,
}

impl Arena {
    /// Build an empty board sized by `config`, a closed gate and an
    /// unsignalled round.
    ///
    /// Returns the arena and the dealer's end of the validation queue.
    pub fn new(config: &GameConfig, sink: Arc<dyn Sink>) -> (Self, Receiver<PlayerId>) {
        let (board, claims) = Board::new(
            config.table_size,
            config.deck_len(),
            config.players,
            config.table_delay(),
            Arc::clone(&sink),
        );
        let arena = Self {
            board: Arc::new(board),
            gate: Arc::new(InputGate::new()),
            round: Arc::new(RoundSignal::new()),
            sink,
        };
        (arena, claims)
    }

    /// Create an idle player bound to this arena.
    pub fn player(&self, id: PlayerId, human: bool) -> PlayerHandle {
        PlayerHandle::new(
            id,
            human,
            Arc::clone(&self.board),
            Arc::clone(&self.gate),
            Arc::clone(&self.round),
            Arc::clone(&self.sink),
        )
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("board", &self.board)
            .field("gate", &self.gate)
            .field("round", &self.round)
            .finish_non_exhaustive()
    }
}
