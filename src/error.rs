//! Crate-level error type.

use crate::board::BoardError;
use crate::config::ConfigError;
use thiserror::Error;

/// Errors that end a game or prevent it from starting.
///
/// Stale claims, interrupted waits and an exhausted deck are part of normal
/// play and never show up here.
#[derive(Debug, Error)]
pub enum GameError {
    /// The configuration cannot produce a game.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A board primitive was called with a broken precondition.
    #[error(transparent)]
    Board(#[from] BoardError),
    /// The OS refused to start an actor thread.
    #[error("failed to spawn thread {name}")]
    Spawn {
        /// Name of the thread that failed to start.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The dealer thread panicked before publishing standings.
    #[error("dealer thread panicked")]
    DealerPanicked,
}

/// Result alias for game-level operations.
pub type Result<T, E = GameError> = std::result::Result<T, E>;
