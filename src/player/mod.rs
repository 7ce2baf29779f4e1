//! Player actors.
//!
//! Each player runs on its own thread and moves through
//! `AwaitingRoundStart → Idle → AwaitingVerdict → ServingFreeze → Idle → …
//! → Terminated`. It has four suspension points, all interruptible by
//! [`PlayerHandle::terminate`]:
//!
//! ```text
//!  input source ──SlotRequest──▶ request queue (3) ──▶ player thread
//!                                                         │ toggle
//!                                                         ▼
//!                        dealer ◀──PlayerId── validation queue (board)
//!                          │
//!                          └──Verdict──▶ verdict channel (1) ──▶ player
//! ```

mod actor;
mod driver;
mod messages;
mod seat;

pub use actor::PlayerHandle;
pub use driver::ComputerDriver;
pub use messages::{PlayerState, PlayerStats, Verdict};
pub use seat::Seat;
