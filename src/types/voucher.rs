use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Buyer-signed authorization of a cumulative unit total.
///
/// `signature` is kept as raw `r || s || v` bytes; whether they form a valid
/// signature at all is decided by the verifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub claimed_amount: U256,
    pub nonce: U256,
    pub signature: Bytes,
}

impl Voucher {
    pub fn new(claimed_amount: U256, nonce: U256, signature: impl Into<Bytes>) -> Self {
        Self {
            claimed_amount,
            nonce,
            signature: signature.into(),
        }
    }
}

/// Emitted for every accepted `claim_payment`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub channel: Address,
    pub delta_units: U256,
    pub transferred: U256,
    pub cumulative_units: U256,
    pub cumulative_paid: U256,
}

/// Emitted when the buyer reclaims the escrow after the deadline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub channel: Address,
    pub buyer: Address,
    pub refunded: U256,
    pub closed_at: u64,
}
