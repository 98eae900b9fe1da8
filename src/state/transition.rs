//! The channel state machine.
//!
//! Every entry point is an [`Operation`]; [`plan`] decides, without touching
//! the channel, what the operation would do in the channel's current status.
//! The ledger performs the resulting value transfer and only then calls
//! [`Effect::commit`], so a rejected or failed operation never mutates state.

use crate::{
    types::{Channel, ChannelError, ChannelStatus, RefundRecord, SettlementRecord, Voucher},
    utils::crypto::VoucherVerifier,
};
use ethers::types::{Address, U256};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    ClaimPayment(Voucher),
    ClaimTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Settled(SettlementRecord),
    Refunded(RefundRecord),
}

/// A validated payment to the seller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payout {
    pub seller: Address,
    pub delta_units: U256,
    pub amount: U256,
    pub new_highest: U256,
}

/// A validated return of the unclaimed escrow to the buyer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Refund {
    pub buyer: Address,
    pub amount: U256,
    pub at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Pay(Payout),
    Refund(Refund),
}

/// A planned state change together with the transfer it requires.
pub trait Transition {
    type Record;

    /// Recipient and value of the transfer backing this change.
    fn transfer(&self) -> (Address, U256);

    fn commit(self, channel: &mut Channel) -> Self::Record;
}

impl Transition for Payout {
    type Record = SettlementRecord;

    fn transfer(&self) -> (Address, U256) {
        (self.seller, self.amount)
    }

    fn commit(self, channel: &mut Channel) -> SettlementRecord {
        channel.highest_claimed_amount = self.new_highest;
        SettlementRecord {
            channel: channel.address,
            delta_units: self.delta_units,
            transferred: self.amount,
            cumulative_units: self.new_highest,
            cumulative_paid: channel.paid_out(),
        }
    }
}

impl Transition for Refund {
    type Record = RefundRecord;

    fn transfer(&self) -> (Address, U256) {
        (self.buyer, self.amount)
    }

    fn commit(self, channel: &mut Channel) -> RefundRecord {
        channel.closed = true;
        RefundRecord {
            channel: channel.address,
            buyer: self.buyer,
            refunded: self.amount,
            closed_at: self.at,
        }
    }
}

impl Transition for Effect {
    type Record = Outcome;

    fn transfer(&self) -> (Address, U256) {
        match self {
            Effect::Pay(payout) => payout.transfer(),
            Effect::Refund(refund) => refund.transfer(),
        }
    }

    fn commit(self, channel: &mut Channel) -> Outcome {
        match self {
            Effect::Pay(payout) => Outcome::Settled(payout.commit(channel)),
            Effect::Refund(refund) => Outcome::Refunded(refund.commit(channel)),
        }
    }
}

pub fn plan(
    channel: &Channel,
    operation: &Operation,
    now: u64,
    verifier: &VoucherVerifier,
) -> Result<Effect, ChannelError> {
    match (channel.status(), operation) {
        (ChannelStatus::Closed, Operation::ClaimPayment(_)) => Err(ChannelError::AlreadyClosed),
        (ChannelStatus::Closed, Operation::ClaimTimeout) => Err(ChannelError::AlreadyClosed),
        (ChannelStatus::Open, Operation::ClaimPayment(voucher)) => {
            plan_claim(channel, voucher, verifier).map(Effect::Pay)
        }
        (ChannelStatus::Open, Operation::ClaimTimeout) => {
            plan_timeout(channel, now).map(Effect::Refund)
        }
    }
}

pub fn plan_claim(
    channel: &Channel,
    voucher: &Voucher,
    verifier: &VoucherVerifier,
) -> Result<Payout, ChannelError> {
    ensure_open(channel)?;

    let signer = verifier.recover(voucher, channel.buyer, channel.address)?;
    if signer != channel.buyer {
        return Err(ChannelError::SignatureMismatch);
    }

    let recorded = channel.highest_claimed_amount;
    let delta_units = match voucher.claimed_amount.checked_sub(recorded) {
        Some(delta) if !delta.is_zero() => delta,
        _ => {
            return Err(ChannelError::StaleOrInvalidAmount {
                claimed: voucher.claimed_amount,
                recorded,
            })
        }
    };

    // Implied by the deposit invariant; still enforced.
    let remaining = channel.remaining();
    let amount = delta_units
        .checked_mul(channel.unit_price)
        .filter(|amount| *amount <= remaining)
        .ok_or_else(|| ChannelError::InsufficientDeposit {
            requested: delta_units.saturating_mul(channel.unit_price),
            remaining,
        })?;

    Ok(Payout {
        seller: channel.seller,
        delta_units,
        amount,
        new_highest: voucher.claimed_amount,
    })
}

pub fn plan_timeout(channel: &Channel, now: u64) -> Result<Refund, ChannelError> {
    ensure_open(channel)?;

    if !channel.deadline.has_passed(now) {
        return Err(ChannelError::NotYetExpired);
    }

    Ok(Refund {
        buyer: channel.buyer,
        amount: channel.remaining(),
        at: now,
    })
}

fn ensure_open(channel: &Channel) -> Result<(), ChannelError> {
    match channel.status() {
        ChannelStatus::Open => Ok(()),
        ChannelStatus::Closed => Err(ChannelError::AlreadyClosed),
    }
}
