//! # Set Arena
//!
//! A concurrent engine for a real-time "spot the set" card game.
//!
//! A dealer thread owns the flow of the game while one thread per player
//! races to claim triples on a shared board. Claims are judged strictly in
//! the order they were queued, each claim gets exactly one verdict, and
//! every thread can be interrupted from any blocking point.
//!
//! ## Core Concepts
//!
//! - **Board**: slots, draw pile and claim tokens behind a single lock
//! - **Players**: request queue, verdict channel and freeze per seat
//! - **Dealer**: fills, judges, reshuffles on timeout, announces winners
//! - **Sink**: one-way notices for whatever presents the game
//!
//! ## Example
//!
//! ```rust,no_run
//! use set_arena::{GameBuilder, GameConfig};
//!
//! let config = GameConfig {
//!     human_players: 0,
//!     ..GameConfig::default()
//! };
//! let game = GameBuilder::new(config).start()?;
//! let standings = game.join()?;
//! println!("{standings}");
//! # Ok::<(), set_arena::GameError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod arena;
pub mod board;
pub mod config;
pub mod dealer;
pub mod error;
pub mod game;
pub mod player;
pub mod rules;
pub mod sink;
pub mod terminal;

// Re-exports for convenience
pub use arena::Arena;
pub use board::{Board, BoardError, ClaimOutcome, ItemId, PlayerId, Slot, SlotRequest};
pub use config::{ConfigError, GameConfig, SET_SIZE};
pub use dealer::{Countdown, Dealer, DealerStop, Standings};
pub use error::{GameError, Result};
pub use game::{GameBuilder, GameHandle};
pub use player::{ComputerDriver, PlayerHandle, PlayerState, PlayerStats, Verdict};
pub use rules::{CardRules, Solver, Validator};
pub use sink::{ChannelSink, LogSink, Notice, NoticeKind, NullSink, Sink};
pub use terminal::{ConsoleSink, KeyCommand, KeyboardActor, Keymap};
