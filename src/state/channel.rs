use super::{
    clock::Clock,
    escrow::ValueTransfer,
    transition::{plan, plan_claim, plan_timeout, Operation, Outcome, Transition},
};
use crate::{
    types::{
        Channel, ChannelError, ChannelParams, ChannelStatus, ChannelView, Deadline, RefundRecord,
        SettlementRecord, Voucher,
    },
    utils::crypto::VoucherVerifier,
};
use ethers::types::{Address, Bytes, U256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Handle to a single channel's ledger.
///
/// Clones share the same channel. Every operation holds the channel lock from
/// validation through the value transfer to the state update, so claims and
/// timeouts on one channel are strictly serialized.
#[derive(Clone)]
pub struct ChannelLedger {
    channel: Arc<Mutex<Channel>>,
    transfer: Arc<dyn ValueTransfer>,
    clock: Arc<dyn Clock>,
    verifier: VoucherVerifier,
}

impl ChannelLedger {
    /// Escrows the deposit and opens the channel.
    pub async fn create(
        params: ChannelParams,
        transfer: Arc<dyn ValueTransfer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChannelError> {
        let address = transfer.open(params.buyer, params.deposit).await.map_err(|e| {
            warn!(buyer = ?params.buyer, error = %e, "deposit not escrowed");
            e
        })?;

        let channel = Channel::open(address, &params, clock.now());
        info!(
            channel = ?channel.address,
            buyer = ?channel.buyer,
            seller = ?channel.seller,
            unit_price = %channel.unit_price,
            deposit = %channel.deposit,
            deadline = ?channel.deadline,
            "channel opened"
        );

        Ok(Self {
            channel: Arc::new(Mutex::new(channel)),
            transfer,
            clock,
            verifier: VoucherVerifier,
        })
    }

    /// Runs one operation against the channel.
    pub async fn apply(&self, operation: Operation) -> Result<Outcome, ChannelError> {
        let name = op_name(&operation);
        let verifier = self.verifier;
        let outcome = self
            .execute(name, |channel, now| plan(channel, &operation, now, &verifier))
            .await?;

        match &outcome {
            Outcome::Settled(record) => log_settled(record),
            Outcome::Refunded(record) => log_refunded(record),
        }
        Ok(outcome)
    }

    pub async fn claim_payment(
        &self,
        claimed_amount: U256,
        nonce: U256,
        signature: impl Into<Bytes>,
    ) -> Result<SettlementRecord, ChannelError> {
        let voucher = Voucher::new(claimed_amount, nonce, signature);
        let verifier = self.verifier;
        let record = self
            .execute("claim_payment", |channel, _| {
                plan_claim(channel, &voucher, &verifier)
            })
            .await?;

        log_settled(&record);
        Ok(record)
    }

    pub async fn claim_timeout(&self) -> Result<RefundRecord, ChannelError> {
        let record = self.execute("claim_timeout", plan_timeout).await?;

        log_refunded(&record);
        Ok(record)
    }

    /// Plans, transfers and commits while holding the channel lock.
    async fn execute<T, F>(&self, op: &'static str, planner: F) -> Result<T::Record, ChannelError>
    where
        T: Transition + Send,
        F: FnOnce(&Channel, u64) -> Result<T, ChannelError> + Send,
    {
        let mut channel = self.channel.lock().await;
        let now = self.clock.now();

        let change = planner(&*channel, now).map_err(|e| {
            warn!(channel = ?channel.address, op, error = %e, "operation rejected");
            e
        })?;

        let (to, amount) = change.transfer();
        self.transfer
            .release(channel.address, to, amount)
            .await
            .map_err(|e| {
                warn!(channel = ?channel.address, op, error = %e, "transfer failed");
                ChannelError::from(e)
            })?;

        Ok(change.commit(&mut *channel))
    }

    /// Whether `voucher` was signed by the buyer for this channel.
    pub async fn verify_voucher(&self, voucher: &Voucher) -> bool {
        let channel = self.channel.lock().await;
        self.verifier.verify(voucher, channel.buyer, channel.address)
    }

    pub async fn snapshot(&self) -> ChannelView {
        self.channel.lock().await.view()
    }

    pub async fn channel_address(&self) -> Address {
        self.channel.lock().await.address
    }

    pub async fn buyer(&self) -> Address {
        self.channel.lock().await.buyer
    }

    pub async fn seller(&self) -> Address {
        self.channel.lock().await.seller
    }

    pub async fn unit_price(&self) -> U256 {
        self.channel.lock().await.unit_price
    }

    pub async fn deposit(&self) -> U256 {
        self.channel.lock().await.deposit
    }

    pub async fn highest_claimed_amount(&self) -> U256 {
        self.channel.lock().await.highest_claimed_amount
    }

    pub async fn deadline(&self) -> Deadline {
        self.channel.lock().await.deadline
    }

    pub async fn closed(&self) -> bool {
        self.channel.lock().await.closed
    }

    pub async fn status(&self) -> ChannelStatus {
        self.channel.lock().await.status()
    }

    pub async fn remaining(&self) -> U256 {
        self.channel.lock().await.remaining()
    }

    pub async fn paid_out(&self) -> U256 {
        self.channel.lock().await.paid_out()
    }
}

fn log_settled(record: &SettlementRecord) {
    info!(
        channel = ?record.channel,
        delta_units = %record.delta_units,
        transferred = %record.transferred,
        cumulative_units = %record.cumulative_units,
        "payment claimed"
    );
}

fn log_refunded(record: &RefundRecord) {
    info!(
        channel = ?record.channel,
        refunded = %record.refunded,
        "timeout claimed, channel closed"
    );
}

fn op_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::ClaimPayment(_) => "claim_payment",
        Operation::ClaimTimeout => "claim_timeout",
    }
}
