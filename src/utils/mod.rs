pub mod crypto;
pub mod signer;

pub use crypto::{create_voucher_message, voucher_digest, VoucherVerifier};
pub use signer::{VoucherBook, VoucherSigner};
