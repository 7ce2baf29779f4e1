//! Presentation sink: one-way notifications out of the engine.
//!
//! The engine reports what happens on the board through a [`Sink`] and never
//! waits on it. Implementations must return quickly; anything slow belongs on
//! the other side of a [`ChannelSink`].

use crate::board::{ItemId, PlayerId, Slot};
use bitflags::bitflags;
use crossbeam_channel::{Sender, TrySendError};
use std::time::Duration;

bitflags! {
    /// Kinds of notifications, used to filter what a sink forwards.
    ///
    /// ```
    /// use set_arena::NoticeKind;
    /// let quiet = NoticeKind::all() - NoticeKind::COUNTDOWN - NoticeKind::TOKENS;
    /// assert!(quiet.contains(NoticeKind::SCORE));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NoticeKind: u8 {
        /// Items placed on or removed from slots.
        const BOARD = 0b0000_0001;
        /// Claim tokens placed or removed.
        const TOKENS = 0b0000_0010;
        /// Round countdown updates.
        const COUNTDOWN = 0b0000_0100;
        /// Player freeze updates.
        const FREEZE = 0b0000_1000;
        /// Score changes.
        const SCORE = 0b0001_0000;
        /// Final winner announcement.
        const WINNERS = 0b0010_0000;
    }
}

/// A single notification, as forwarded by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// An item was placed in a slot.
    ItemPlaced {
        /// The item.
        item: ItemId,
        /// Where it was placed.
        slot: Slot,
    },
    /// A slot was vacated.
    ItemRemoved {
        /// The vacated slot.
        slot: Slot,
    },
    /// A player put a claim token on a slot.
    TokenPlaced {
        /// The claiming player.
        player: PlayerId,
        /// The claimed slot.
        slot: Slot,
    },
    /// A claim token was taken off a slot.
    TokenRemoved {
        /// The player whose token it was.
        player: PlayerId,
        /// The slot.
        slot: Slot,
    },
    /// Countdown update.
    Countdown {
        /// Time left in the round.
        remaining: Duration,
        /// Whether the warning threshold was crossed.
        urgent: bool,
    },
    /// Freeze update for a player. Zero means the freeze is over.
    Freeze {
        /// The frozen player.
        player: PlayerId,
        /// Time left in the freeze.
        remaining: Duration,
    },
    /// A player's score changed.
    Score {
        /// The player.
        player: PlayerId,
        /// New score.
        score: u32,
    },
    /// The game is over.
    Winners(Vec<PlayerId>),
}

impl Notice {
    /// The kind this notice belongs to.
    pub const fn kind(&self) -> NoticeKind {
        match self {
            Self::ItemPlaced { .. } | Self::ItemRemoved { .. } => NoticeKind::BOARD,
            Self::TokenPlaced { .. } | Self::TokenRemoved { .. } => NoticeKind::TOKENS,
            Self::Countdown { .. } => NoticeKind::COUNTDOWN,
            Self::Freeze { .. } => NoticeKind::FREEZE,
            Self::Score { .. } => NoticeKind::SCORE,
            Self::Winners(_) => NoticeKind::WINNERS,
        }
    }
}

/// Receiver of engine notifications.
///
/// Every method defaults to doing nothing, so a sink only implements what it
/// displays. Calls arrive from the dealer thread and from player threads,
/// sometimes while the board lock is held.
#[allow(unused_variables)]
pub trait Sink: Send + Sync {
    /// An item was placed in a slot.
    fn item_placed(&self, item: ItemId, slot: Slot) {}
    /// A slot was vacated.
    fn item_removed(&self, slot: Slot) {}
    /// A player put a claim token on a slot.
    fn token_placed(&self, player: PlayerId, slot: Slot) {}
    /// A claim token was taken off a slot.
    fn token_removed(&self, player: PlayerId, slot: Slot) {}
    /// Countdown update.
    fn countdown(&self, remaining: Duration, urgent: bool) {}
    /// Freeze update for a player.
    fn freeze(&self, player: PlayerId, remaining: Duration) {}
    /// A player's score changed.
    fn score(&self, player: PlayerId, score: u32) {}
    /// The game is over; every listed player shares first place.
    fn winners(&self, players: &[PlayerId]) {}
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl Sink for NullSink {}

/// A sink that turns notifications into `tracing` events.
///
/// Board and token traffic is logged at `trace`, player updates at `debug`,
/// and the winner announcement at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn item_placed(&self, item: ItemId, slot: Slot) {
        tracing::trace!(item, slot, "item placed");
    }

    fn item_removed(&self, slot: Slot) {
        tracing::trace!(slot, "item removed");
    }

    fn token_placed(&self, player: PlayerId, slot: Slot) {
        tracing::trace!(player, slot, "token placed");
    }

    fn token_removed(&self, player: PlayerId, slot: Slot) {
        tracing::trace!(player, slot, "token removed");
    }

    fn countdown(&self, remaining: Duration, urgent: bool) {
        tracing::trace!(remaining_ms = remaining.as_millis() as u64, urgent, "countdown");
    }

    fn freeze(&self, player: PlayerId, remaining: Duration) {
        tracing::debug!(player, remaining_ms = remaining.as_millis() as u64, "freeze");
    }

    fn score(&self, player: PlayerId, score: u32) {
        tracing::debug!(player, score, "score");
    }

    fn winners(&self, players: &[PlayerId]) {
        tracing::info!(?players, "winners");
    }
}

/// A sink that forwards notifications over a channel.
///
/// Sends never block: when the channel is full the notice is dropped, which
/// keeps the engine independent of the consumer's speed.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<Notice>,
    mask: NoticeKind,
}

impl ChannelSink {
    /// Forward every notice to `sender`.
    pub fn new(sender: Sender<Notice>) -> Self {
        Self::with_mask(sender, NoticeKind::all())
    }

    /// Forward only notices whose kind is in `mask`.
    pub const fn with_mask(sender: Sender<Notice>, mask: NoticeKind) -> Self {
        Self { sender, mask }
    }

    fn forward(&self, notice: Notice) {
        if !self.mask.contains(notice.kind()) {
            return;
        }
        if let Err(TrySendError::Full(notice)) = self.sender.try_send(notice) {
            tracing::warn!(?notice, "notice channel full, dropping");
        }
    }
}

impl Sink for ChannelSink {
    fn item_placed(&self, item: ItemId, slot: Slot) {
        self.forward(Notice::ItemPlaced { item, slot });
    }

    fn item_removed(&self, slot: Slot) {
        self.forward(Notice::ItemRemoved { slot });
    }

    fn token_placed(&self, player: PlayerId, slot: Slot) {
        self.forward(Notice::TokenPlaced { player, slot });
    }

    fn token_removed(&self, player: PlayerId, slot: Slot) {
        self.forward(Notice::TokenRemoved { player, slot });
    }

    fn countdown(&self, remaining: Duration, urgent: bool) {
        self.forward(Notice::Countdown { remaining, urgent });
    }

    fn freeze(&self, player: PlayerId, remaining: Duration) {
        self.forward(Notice::Freeze { player, remaining });
    }

    fn score(&self, player: PlayerId, score: u32) {
        self.forward(Notice::Score { player, score });
    }

    fn winners(&self, players: &[PlayerId]) {
        self.forward(Notice::Winners(players.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, unbounded};

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (tx, rx) = unbounded();
        let sink = ChannelSink::new(tx);

        sink.item_placed(7, 2);
        sink.score(1, 3);
        sink.winners(&[1]);

        let notices: Vec<Notice> = rx.try_iter().collect();
        assert_eq!(
            notices,
            vec![
                Notice::ItemPlaced { item: 7, slot: 2 },
                Notice::Score { player: 1, score: 3 },
                Notice::Winners(vec![1]),
            ]
        );
    }

    #[test]
    fn test_channel_sink_mask_filters() {
        let (tx, rx) = unbounded();
        let sink = ChannelSink::with_mask(tx, NoticeKind::SCORE | NoticeKind::WINNERS);

        sink.countdown(Duration::from_secs(3), false);
        sink.token_placed(0, 4);
        sink.score(0, 1);

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Notice::Score { player: 0, score: 1 }]);
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (tx, rx) = bounded(1);
        let sink = ChannelSink::new(tx);

        sink.item_removed(0);
        sink.item_removed(1);

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Notice::ItemRemoved { slot: 0 }]);
    }

    #[test]
    fn test_notice_kind() {
        assert_eq!(Notice::Winners(vec![]).kind(), NoticeKind::WINNERS);
        assert_eq!(
            Notice::Countdown { remaining: Duration::ZERO, urgent: true }.kind(),
            NoticeKind::COUNTDOWN
        );
    }
}
