//! Voucher-based micropayment channel between one buyer and one seller.
//!
//! The buyer escrows a deposit and signs vouchers for the cumulative number
//! of units bought so far; the seller redeems the highest voucher it holds.
//! After the deadline the buyer may reclaim whatever was never claimed.

pub mod config;
pub mod handlers;
pub mod state;
pub mod types;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use handlers::channel::{channel_handler, claim_handler, timeout_handler, verify_handler};
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use state::{
    ChannelLedger, Clock, InMemoryEscrow, ManualClock, Operation, Outcome, SystemClock,
    ValueTransfer,
};
pub use types::{
    Channel, ChannelError, ChannelParams, ChannelStatus, ChannelView, Deadline, RefundRecord,
    SettlementRecord, TransferError, Voucher,
};
pub use utils::{VoucherBook, VoucherSigner, VoucherVerifier};

pub fn create_channel_router(ledger: ChannelLedger) -> Router {
    Router::new()
        .route("/channel", get(channel_handler))
        .route("/channel/claim", post(claim_handler))
        .route("/channel/verify", post(verify_handler))
        .route("/channel/timeout", post(timeout_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{ClaimRequest, VerifyResponse};
    use axum::{
        body::Body,
        http::{self, Request, StatusCode},
    };
    use ethers::{
        signers::LocalWallet,
        types::{Address, U256},
    };
    use std::str::FromStr;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    const START: u64 = 1_642_000_000;

    // Helper function to create a buyer signer with a known private key
    fn create_test_signer() -> VoucherSigner {
        VoucherSigner::new(
            LocalWallet::from_str(
                "1234567890123456789012345678901234567890123456789012345678901234",
            )
            .unwrap(),
        )
    }

    async fn create_test_app(
        signer: &VoucherSigner,
    ) -> (Router, ChannelLedger, Arc<ManualClock>, Arc<InMemoryEscrow>) {
        let escrow = Arc::new(InMemoryEscrow::new());
        escrow.fund(signer.address(), U256::from(500_000)).await;
        let clock = Arc::new(ManualClock::new(START));

        let params = ChannelParams {
            buyer: signer.address(),
            seller: Address::random(),
            unit_price: U256::from(50),
            deposit: U256::from(500_000),
            deadline_offset: Some(3_600),
        };
        let ledger = ChannelLedger::create(params, escrow.clone(), clock.clone())
            .await
            .unwrap();

        (create_channel_router(ledger.clone()), ledger, clock, escrow)
    }

    async fn create_claim(
        signer: &VoucherSigner,
        ledger: &ChannelLedger,
        amount: u64,
        nonce: u64,
    ) -> ClaimRequest {
        let voucher = signer
            .sign(
                U256::from(amount),
                U256::from(nonce),
                ledger.channel_address().await,
            )
            .await
            .unwrap();

        ClaimRequest {
            amount: voucher.claimed_amount,
            nonce: voucher.nonce,
            signature: format!("0x{}", hex::encode(&voucher.signature)),
        }
    }

    async fn send_json(app: Router, uri: &str, body: &ClaimRequest) -> axum::response::Response {
        let request = Request::builder()
            .method(http::Method::POST)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();

        app.oneshot(request).await.unwrap()
    }

    async fn send_empty(app: Router, method: http::Method, uri: &str) -> axum::response::Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        app.oneshot(request).await.unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_valid_claim() {
        let signer = create_test_signer();
        let (app, ledger, _, _) = create_test_app(&signer).await;
        let claim = create_claim(&signer, &ledger, 10, 0).await;

        let response = send_json(app, "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::OK);

        let record: SettlementRecord = read_json(response).await;
        assert_eq!(record.transferred, U256::from(500));
        assert_eq!(record.cumulative_units, U256::from(10));
    }

    #[tokio::test]
    async fn test_invalid_signature() {
        let signer = create_test_signer();
        let (app, ledger, _, _) = create_test_app(&signer).await;
        let mut claim = create_claim(&signer, &ledger, 10, 0).await;

        // Create an obviously invalid signature
        claim.signature = hex::encode([1u8; 65]);

        let response = send_json(app, "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ledger.highest_claimed_amount().await, U256::zero());
    }

    #[tokio::test]
    async fn test_malformed_signature() {
        let signer = create_test_signer();
        let (app, ledger, _, _) = create_test_app(&signer).await;
        let mut claim = create_claim(&signer, &ledger, 10, 0).await;
        claim.signature = "invalid-signature".to_string();

        let response = send_json(app, "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stale_claim() {
        let signer = create_test_signer();
        let (app, ledger, _, _) = create_test_app(&signer).await;

        let claim = create_claim(&signer, &ledger, 20, 1).await;
        let response = send_json(app.clone(), "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::OK);

        let claim = create_claim(&signer, &ledger, 15, 2).await;
        let response = send_json(app, "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(ledger.highest_claimed_amount().await, U256::from(20));
    }

    #[tokio::test]
    async fn test_claim_beyond_deposit() {
        let signer = create_test_signer();
        let (app, ledger, _, escrow) = create_test_app(&signer).await;
        let seller = ledger.seller().await;

        let claim = create_claim(&signer, &ledger, 10, 0).await;
        let response = send_json(app.clone(), "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::OK);
        let before = ledger.snapshot().await;

        let claim = create_claim(&signer, &ledger, 10_001, 1).await;
        let response = send_json(app, "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        assert_eq!(ledger.highest_claimed_amount().await, U256::from(10));
        assert_eq!(ledger.snapshot().await, before);
        assert_eq!(escrow.balance_of(seller).await, U256::from(500));
        assert_eq!(
            escrow.escrowed(ledger.channel_address().await).await,
            Some(U256::from(499_500))
        );
    }

    #[tokio::test]
    async fn test_verify_endpoint() {
        let signer = create_test_signer();
        let (app, ledger, _, _) = create_test_app(&signer).await;
        let mut claim = create_claim(&signer, &ledger, 10, 0).await;

        let response = send_json(app.clone(), "/channel/verify", &claim).await;
        assert_eq!(response.status(), StatusCode::OK);
        let verdict: VerifyResponse = read_json(response).await;
        assert!(verdict.valid);

        claim.amount = U256::from(11);
        let response = send_json(app, "/channel/verify", &claim).await;
        let verdict: VerifyResponse = read_json(response).await;
        assert!(!verdict.valid);
        assert_eq!(ledger.highest_claimed_amount().await, U256::zero());
    }

    #[tokio::test]
    async fn test_timeout_lifecycle() {
        let signer = create_test_signer();
        let (app, ledger, clock, _) = create_test_app(&signer).await;

        let claim = create_claim(&signer, &ledger, 20, 0).await;
        let response = send_json(app.clone(), "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send_empty(app.clone(), http::Method::POST, "/channel/timeout").await;
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);

        clock.advance(3_600);
        let response = send_empty(app.clone(), http::Method::POST, "/channel/timeout").await;
        assert_eq!(response.status(), StatusCode::OK);
        let refund: RefundRecord = read_json(response).await;
        assert_eq!(refund.refunded, U256::from(499_000));

        let response = send_empty(app.clone(), http::Method::POST, "/channel/timeout").await;
        assert_eq!(response.status(), StatusCode::GONE);

        let claim = create_claim(&signer, &ledger, 30, 1).await;
        let response = send_json(app.clone(), "/channel/claim", &claim).await;
        assert_eq!(response.status(), StatusCode::GONE);

        let response = send_empty(app, http::Method::GET, "/channel").await;
        assert_eq!(response.status(), StatusCode::OK);
        let view: ChannelView = read_json(response).await;
        assert_eq!(view.status, ChannelStatus::Closed);
        assert_eq!(view.highest_claimed_amount, U256::from(20));
        assert_eq!(view.remaining, U256::from(499_000));
    }
}
