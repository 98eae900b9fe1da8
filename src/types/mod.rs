pub mod channel;
pub mod error;
pub mod voucher;

pub use channel::{Channel, ChannelParams, ChannelStatus, ChannelView, Deadline};
pub use error::{ChannelError, TransferError};
pub use voucher::{RefundRecord, SettlementRecord, Voucher};
