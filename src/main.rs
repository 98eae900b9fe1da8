//! Settlement node
//!
//! Opens one channel against an in-memory escrow and serves its HTTP surface.

use ethers::types::U256;
use iot_micropayment::{create_channel_router, ChannelLedger, Config, InMemoryEscrow, SystemClock};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    info!(
        "Buyer: {:?}, Seller: {:?}, unit price: {}, deposit: {}",
        config.channel.buyer, config.channel.seller, config.channel.unit_price, config.channel.deposit
    );

    let escrow = Arc::new(InMemoryEscrow::new());
    escrow
        .fund(config.channel.buyer, U256::from(config.escrow.buyer_funds))
        .await;

    let ledger = ChannelLedger::create(config.channel_params(), escrow, Arc::new(SystemClock)).await?;
    info!("Channel address: {:?}", ledger.channel_address().await);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);
    axum::serve(listener, create_channel_router(ledger)).await?;

    Ok(())
}
