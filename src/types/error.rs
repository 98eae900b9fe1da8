use axum::http::StatusCode;
use ethers::types::{Address, U256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Voucher signer does not match the channel buyer")]
    SignatureMismatch,
    #[error("Claimed amount {claimed} does not exceed recorded total {recorded}")]
    StaleOrInvalidAmount { claimed: U256, recorded: U256 },
    #[error("Claim of {requested} exceeds remaining escrow {remaining}")]
    InsufficientDeposit { requested: U256, remaining: U256 },
    #[error("Channel deadline has not been reached")]
    NotYetExpired,
    #[error("Channel is closed")]
    AlreadyClosed,
    #[error("Value transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Account {account:?} holds {available}, needs {required}")]
    InsufficientFunds {
        account: Address,
        available: U256,
        required: U256,
    },
    #[error("Escrow for channel {0:?} does not exist")]
    UnknownEscrow(Address),
    #[error("Escrow for channel {channel:?} holds {available}, release of {requested} refused")]
    EscrowExhausted {
        channel: Address,
        available: U256,
        requested: U256,
    },
    #[error("Transfer backend unavailable: {0}")]
    Unavailable(String),
}

impl From<ChannelError> for StatusCode {
    fn from(error: ChannelError) -> Self {
        match error {
            ChannelError::SignatureMismatch => StatusCode::UNAUTHORIZED,
            ChannelError::StaleOrInvalidAmount { .. } => StatusCode::CONFLICT,
            ChannelError::InsufficientDeposit { .. } => StatusCode::PAYMENT_REQUIRED,
            ChannelError::NotYetExpired => StatusCode::PRECONDITION_FAILED,
            ChannelError::AlreadyClosed => StatusCode::GONE,
            ChannelError::Transfer(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
