use crate::types::TransferError;
use async_trait::async_trait;
use ethers::{
    types::{Address, U256},
    utils::get_contract_address,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Facility that holds channel deposits and moves value out of them.
#[async_trait]
pub trait ValueTransfer: Send + Sync {
    /// Locks `deposit` from `buyer` into a fresh escrow and returns the
    /// escrow's address, which doubles as the channel identity.
    async fn open(&self, buyer: Address, deposit: U256) -> Result<Address, TransferError>;

    /// Moves `amount` out of the escrow of `channel` to `to`.
    async fn release(&self, channel: Address, to: Address, amount: U256)
        -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct Accounts {
    balances: HashMap<Address, U256>,
    escrows: HashMap<Address, U256>,
    nonces: HashMap<Address, U256>,
}

/// Account-balance escrow kept in memory.
///
/// Channel addresses are derived like contract addresses, from the buyer and
/// the number of escrows that buyer has opened before.
#[derive(Debug, Default)]
pub struct InMemoryEscrow {
    accounts: RwLock<Accounts>,
}

impl InMemoryEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fund(&self, account: Address, amount: U256) {
        let mut accounts = self.accounts.write().await;
        let balance = accounts.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub async fn balance_of(&self, account: Address) -> U256 {
        let accounts = self.accounts.read().await;
        accounts.balances.get(&account).copied().unwrap_or_default()
    }

    pub async fn escrowed(&self, channel: Address) -> Option<U256> {
        let accounts = self.accounts.read().await;
        accounts.escrows.get(&channel).copied()
    }
}

#[async_trait]
impl ValueTransfer for InMemoryEscrow {
    async fn open(&self, buyer: Address, deposit: U256) -> Result<Address, TransferError> {
        let mut accounts = self.accounts.write().await;

        let available = accounts.balances.get(&buyer).copied().unwrap_or_default();
        if available < deposit {
            return Err(TransferError::InsufficientFunds {
                account: buyer,
                available,
                required: deposit,
            });
        }

        let nonce = accounts.nonces.entry(buyer).or_default();
        let channel = get_contract_address(buyer, *nonce);
        *nonce += U256::one();

        accounts.balances.insert(buyer, available - deposit);
        accounts.escrows.insert(channel, deposit);

        tracing::debug!(?buyer, ?channel, %deposit, "escrow opened");
        Ok(channel)
    }

    async fn release(
        &self,
        channel: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), TransferError> {
        let mut accounts = self.accounts.write().await;

        let held = accounts
            .escrows
            .get_mut(&channel)
            .ok_or(TransferError::UnknownEscrow(channel))?;
        if *held < amount {
            return Err(TransferError::EscrowExhausted {
                channel,
                available: *held,
                requested: amount,
            });
        }
        *held -= amount;

        let balance = accounts.balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);

        tracing::debug!(?channel, ?to, %amount, "escrow released");
        Ok(())
    }
}
