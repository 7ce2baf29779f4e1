//! Board module: the single shared, mutable state of a game.
//!
//! This module contains:
//! - [`Board`]: slot/item mapping, claim tokens, draw pile, pending-validation
//!   queue and start-order registry, behind one lock
//! - [`BoardGuard`]: exclusive access for multi-step atomic sequences
//! - [`InputGate`] and [`RoundSignal`]: the global gates that pace players

mod gate;
mod table;

pub use gate::{InputGate, RoundSignal};
pub use table::{Board, BoardGuard};

use crate::config::SET_SIZE;
use thiserror::Error;

/// Index of a position on the board.
pub type Slot = usize;

/// Identity of an item (card).
pub type ItemId = usize;

/// Identity of a player actor.
pub type PlayerId = usize;

/// Where an item currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Waiting in the draw pile.
    InPile,
    /// On the board in the given slot.
    OnBoard(Slot),
    /// Part of a validated set; never returns.
    Retired,
}

/// Result of toggling a claim token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimOutcome {
    /// Nothing changed: the slot is empty, the request is stale, or the
    /// player already holds a full claim.
    NoOp,
    /// The player's token was removed.
    ToggledOff,
    /// A token was added; the claim is not complete yet.
    ToggledOn,
    /// The third token was added and the player is queued for validation.
    CompletedTriple,
}

/// A slot request stamped with the placement it was made against.
///
/// The stamp changes whenever the slot is filled or vacated, so a request
/// that outlives its item can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRequest {
    /// Requested slot.
    pub slot: Slot,
    /// Placement generation of the slot when the request was made.
    pub generation: u64,
}

/// A set currently on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    /// Slots in ascending order.
    pub slots: [Slot; SET_SIZE],
    /// Items, aligned with `slots`.
    pub items: [ItemId; SET_SIZE],
}

/// Broken preconditions of board primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Slot index beyond the board.
    #[error("slot {slot} out of range (board has {slots} slots)")]
    SlotOutOfRange {
        /// Offending slot.
        slot: Slot,
        /// Board size.
        slots: usize,
    },
    /// Item id beyond the deck.
    #[error("item {item} out of range (deck has {items} items)")]
    ItemOutOfRange {
        /// Offending item.
        item: ItemId,
        /// Deck size.
        items: usize,
    },
    /// Placement into an occupied slot.
    #[error("slot {slot} already holds item {item}")]
    SlotOccupied {
        /// Target slot.
        slot: Slot,
        /// Item already there.
        item: ItemId,
    },
    /// Removal from an empty slot.
    #[error("slot {0} is empty")]
    SlotEmpty(Slot),
    /// Placement of an item that is not in the draw pile.
    #[error("item {item} is not in the draw pile ({placement:?})")]
    ItemUnavailable {
        /// Requested item.
        item: ItemId,
        /// Where it actually is.
        placement: Placement,
    },
    /// An invariant check failed.
    #[error("board invariant violated: {0}")]
    Corrupt(String),
}
