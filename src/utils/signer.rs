use super::crypto::voucher_digest;
use crate::types::Voucher;
use ethers::{
    signers::{LocalWallet, Signer, WalletError},
    types::{Address, U256},
};

/// Buyer-side voucher signing. Holds the buyer's key and nothing else.
#[derive(Clone, Debug)]
pub struct VoucherSigner {
    wallet: LocalWallet,
}

impl VoucherSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub async fn sign(
        &self,
        claimed_amount: U256,
        nonce: U256,
        channel: Address,
    ) -> Result<Voucher, WalletError> {
        let digest = voucher_digest(self.address(), claimed_amount, nonce, channel);
        // sign_message applies the EIP-191 prefix
        let signature = self.wallet.sign_message(digest.as_bytes()).await?;

        Ok(Voucher::new(claimed_amount, nonce, signature.to_vec()))
    }
}

/// Running tally of what the buyer has authorized on one channel.
///
/// Each call to [`VoucherBook::next`] bumps the cumulative total and the
/// nonce, so the seller only ever needs the most recent voucher.
#[derive(Clone, Debug)]
pub struct VoucherBook {
    signer: VoucherSigner,
    channel: Address,
    cumulative: U256,
    nonce: U256,
}

impl VoucherBook {
    pub fn new(signer: VoucherSigner, channel: Address) -> Self {
        Self {
            signer,
            channel,
            cumulative: U256::zero(),
            nonce: U256::zero(),
        }
    }

    pub fn cumulative(&self) -> U256 {
        self.cumulative
    }

    pub fn next_nonce(&self) -> U256 {
        self.nonce
    }

    pub async fn next(&mut self, units: U256) -> Result<Voucher, WalletError> {
        let cumulative = self.cumulative.saturating_add(units);
        let voucher = self.signer.sign(cumulative, self.nonce, self.channel).await?;

        self.cumulative = cumulative;
        self.nonce = self.nonce.saturating_add(U256::one());
        Ok(voucher)
    }
}
