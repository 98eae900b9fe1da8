pub mod channel;

pub use channel::{ClaimRequest, VerifyResponse};
