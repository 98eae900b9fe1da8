use crate::types::{ChannelError, Voucher};
use ethers::{
    types::{Address, RecoveryMessage, Signature, H256, U256},
    utils::keccak256,
};

pub trait U256Ext {
    fn to_be_bytes_vec(&self) -> Vec<u8>;
}

impl U256Ext for U256 {
    fn to_be_bytes_vec(&self) -> Vec<u8> {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        bytes.to_vec()
    }
}

/// Tightly packed `buyer || amount || nonce || channel`, matching
/// Solidity's `abi.encodePacked(address, uint256, uint256, address)`.
pub fn create_voucher_message(
    buyer: Address,
    claimed_amount: U256,
    nonce: U256,
    channel: Address,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(20 + 32 + 32 + 20);
    message.extend_from_slice(buyer.as_bytes());
    message.extend_from_slice(&claimed_amount.to_be_bytes_vec());
    message.extend_from_slice(&nonce.to_be_bytes_vec());
    message.extend_from_slice(channel.as_bytes());
    message
}

/// keccak-256 of the packed voucher message. This is what the buyer signs.
pub fn voucher_digest(buyer: Address, claimed_amount: U256, nonce: U256, channel: Address) -> H256 {
    H256::from(keccak256(create_voucher_message(
        buyer,
        claimed_amount,
        nonce,
        channel,
    )))
}

/// Settlement-side recovery of the identity behind a voucher.
///
/// Holds no keys and has no side effects.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoucherVerifier;

impl VoucherVerifier {
    /// Recovers the address that signed `voucher` for the given buyer and
    /// channel. The digest is signed as an EIP-191 personal message, the same
    /// way `eth_sign` and `LocalWallet::sign_message` produce it.
    pub fn recover(
        &self,
        voucher: &Voucher,
        buyer: Address,
        channel: Address,
    ) -> Result<Address, ChannelError> {
        let signature = Signature::try_from(voucher.signature.as_ref()).map_err(|e| {
            tracing::debug!(error = ?e, "malformed voucher signature");
            ChannelError::SignatureMismatch
        })?;
        // Only plain personal-message recovery ids; EIP-155 values would make
        // the last byte malleable.
        if !matches!(signature.v, 0 | 1 | 27 | 28) {
            tracing::debug!(v = signature.v, "unexpected recovery id");
            return Err(ChannelError::SignatureMismatch);
        }

        let digest = voucher_digest(buyer, voucher.claimed_amount, voucher.nonce, channel);
        let recoverable = RecoveryMessage::Data(digest.as_bytes().to_vec());

        signature.recover(recoverable).map_err(|e| {
            tracing::debug!(error = ?e, "signature recovery failed");
            ChannelError::SignatureMismatch
        })
    }

    pub fn verify(&self, voucher: &Voucher, buyer: Address, channel: Address) -> bool {
        matches!(self.recover(voucher, buyer, channel), Ok(signer) if signer == buyer)
    }
}
