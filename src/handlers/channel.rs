use crate::{
    state::ChannelLedger,
    types::{ChannelView, RefundRecord, SettlementRecord, Voucher},
};
use axum::{extract::State, http::StatusCode, Json};
use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// Voucher as submitted by the seller, signature hex encoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub amount: U256,
    pub nonce: U256,
    pub signature: String,
}

impl ClaimRequest {
    fn into_voucher(self) -> Result<Voucher, StatusCode> {
        let signature = hex::decode(self.signature.trim_start_matches("0x"))
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        Ok(Voucher::new(self.amount, self.nonce, signature))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

pub async fn channel_handler(State(ledger): State<ChannelLedger>) -> Json<ChannelView> {
    Json(ledger.snapshot().await)
}

pub async fn claim_handler(
    State(ledger): State<ChannelLedger>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<SettlementRecord>, StatusCode> {
    let voucher = request.into_voucher()?;
    let record = ledger
        .claim_payment(voucher.claimed_amount, voucher.nonce, voucher.signature)
        .await?;
    Ok(Json(record))
}

pub async fn verify_handler(
    State(ledger): State<ChannelLedger>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<VerifyResponse>, StatusCode> {
    let voucher = request.into_voucher()?;
    let valid = ledger.verify_voucher(&voucher).await;
    Ok(Json(VerifyResponse { valid }))
}

pub async fn timeout_handler(
    State(ledger): State<ChannelLedger>,
) -> Result<Json<RefundRecord>, StatusCode> {
    Ok(Json(ledger.claim_timeout().await?))
}
