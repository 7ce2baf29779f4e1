//! Message and status types exchanged between the dealer and players.

/// The dealer's answer to a submitted claim.
///
/// Delivered exactly once per submitted claim, on the player's private
/// verdict channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The claim was a set; the player scored and serves the reward freeze.
    Scored,
    /// The claim was not a set; the player serves the penalty freeze.
    Penalized,
    /// The claim was invalidated before it could be judged, or the game is
    /// shutting down.
    Stale,
}

/// Where a player actor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlayerState {
    /// Created, thread not yet running.
    Created = 0,
    /// Waiting for the dealer's first round.
    AwaitingRoundStart = 1,
    /// Waiting for slot requests.
    Idle = 2,
    /// Holding a full claim, waiting for the dealer.
    AwaitingVerdict = 3,
    /// Sitting out a freeze.
    ServingFreeze = 4,
    /// Thread has exited.
    Terminated = 5,
}

impl PlayerState {
    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::AwaitingRoundStart,
            2 => Self::Idle,
            3 => Self::AwaitingVerdict,
            4 => Self::ServingFreeze,
            5 => Self::Terminated,
            _ => Self::Created,
        }
    }
}

/// Claim traffic counters for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerStats {
    /// Claims submitted to the dealer.
    pub claims: u64,
    /// Verdicts received from the dealer.
    pub verdicts: u64,
}
