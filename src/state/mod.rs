pub mod channel;
pub mod clock;
pub mod escrow;
pub mod transition;

pub use channel::ChannelLedger;
pub use clock::{Clock, ManualClock, SystemClock};
pub use escrow::{InMemoryEscrow, ValueTransfer};
pub use transition::{
    plan, plan_claim, plan_timeout, Effect, Operation, Outcome, Payout, Refund, Transition,
};
