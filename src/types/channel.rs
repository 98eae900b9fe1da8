use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Point in time after which the buyer may reclaim the unclaimed escrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deadline {
    /// Refund path disabled for the lifetime of the channel.
    Disabled,
    /// Unix timestamp in seconds.
    At(u64),
}

impl Deadline {
    pub fn from_offset(now: u64, offset: Option<u64>) -> Self {
        match offset {
            Some(secs) => Deadline::At(now.saturating_add(secs)),
            None => Deadline::Disabled,
        }
    }

    pub fn has_passed(&self, now: u64) -> bool {
        match self {
            Deadline::Disabled => false,
            Deadline::At(at) => now >= *at,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    Open,
    Closed,
}

/// Parameters a buyer opens a channel with.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelParams {
    pub buyer: Address,
    pub seller: Address,
    pub unit_price: U256,
    pub deposit: U256,
    pub deadline_offset: Option<u64>,
}

/// Persistent state of one buyer/seller channel.
///
/// Only `highest_claimed_amount` and `closed` change after creation, and
/// `highest_claimed_amount * unit_price <= deposit` holds at all times.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub address: Address,
    pub buyer: Address,
    pub seller: Address,
    pub unit_price: U256,
    pub deposit: U256,
    pub highest_claimed_amount: U256,
    pub deadline: Deadline,
    pub closed: bool,
}

impl Channel {
    pub fn open(address: Address, params: &ChannelParams, now: u64) -> Self {
        Self {
            address,
            buyer: params.buyer,
            seller: params.seller,
            unit_price: params.unit_price,
            deposit: params.deposit,
            highest_claimed_amount: U256::zero(),
            deadline: Deadline::from_offset(now, params.deadline_offset),
            closed: false,
        }
    }

    /// Value already released to the seller.
    pub fn paid_out(&self) -> U256 {
        self.highest_claimed_amount.saturating_mul(self.unit_price)
    }

    /// Escrow still held for the channel.
    pub fn remaining(&self) -> U256 {
        self.deposit.saturating_sub(self.paid_out())
    }

    pub fn status(&self) -> ChannelStatus {
        if self.closed {
            ChannelStatus::Closed
        } else {
            ChannelStatus::Open
        }
    }

    pub fn view(&self) -> ChannelView {
        ChannelView {
            address: self.address,
            buyer: self.buyer,
            seller: self.seller,
            unit_price: self.unit_price,
            deposit: self.deposit,
            highest_claimed_amount: self.highest_claimed_amount,
            remaining: self.remaining(),
            deadline: self.deadline,
            status: self.status(),
        }
    }
}

/// Read-only snapshot handed to reporting and the HTTP surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelView {
    pub address: Address,
    pub buyer: Address,
    pub seller: Address,
    pub unit_price: U256,
    pub deposit: U256,
    pub highest_claimed_amount: U256,
    pub remaining: U256,
    pub deadline: Deadline,
    pub status: ChannelStatus,
}
