//! Configuration for the settlement node

use crate::types::ChannelParams;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const CONFIG_PATH_VAR: &str = "MICROPAYMENT_CONFIG";

const DEFAULT_DEADLINE_OFFSET: u64 = 30 * 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Missing {0}")]
    Missing(&'static str),
}

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listen address
    pub listen_addr: String,

    /// Channel opened at startup
    pub channel: ChannelConfig,

    /// In-memory escrow seeding
    pub escrow: EscrowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub buyer: Address,
    pub seller: Address,
    pub unit_price: u64,
    pub deposit: u64,
    /// Seconds until the refund path opens; absent disables it
    pub deadline_offset_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowConfig {
    /// Balance credited to the buyer before the deposit is escrowed
    pub buyer_funds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            channel: ChannelConfig {
                buyer: Address::zero(),
                seller: Address::zero(),
                unit_price: 50,
                deposit: 500_000,
                deadline_offset_secs: Some(DEFAULT_DEADLINE_OFFSET),
            },
            escrow: EscrowConfig {
                buyer_funds: 500_000,
            },
        }
    }
}

impl Config {
    /// Load from the file named by `MICROPAYMENT_CONFIG`, else from the environment
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `MICROPAYMENT_*` keys resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(addr) = lookup("MICROPAYMENT_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(buyer) = lookup("MICROPAYMENT_BUYER") {
            config.channel.buyer = parse("MICROPAYMENT_BUYER", &buyer)?;
        }
        if let Some(seller) = lookup("MICROPAYMENT_SELLER") {
            config.channel.seller = parse("MICROPAYMENT_SELLER", &seller)?;
        }
        if let Some(price) = lookup("MICROPAYMENT_UNIT_PRICE") {
            config.channel.unit_price = parse("MICROPAYMENT_UNIT_PRICE", &price)?;
        }
        if let Some(deposit) = lookup("MICROPAYMENT_DEPOSIT") {
            config.channel.deposit = parse("MICROPAYMENT_DEPOSIT", &deposit)?;
        }
        if let Some(offset) = lookup("MICROPAYMENT_DEADLINE_OFFSET") {
            config.channel.deadline_offset_secs = match offset.as_str() {
                "none" | "disabled" => None,
                secs => Some(parse("MICROPAYMENT_DEADLINE_OFFSET", secs)?),
            };
        }
        if let Some(funds) = lookup("MICROPAYMENT_BUYER_FUNDS") {
            config.escrow.buyer_funds = parse("MICROPAYMENT_BUYER_FUNDS", &funds)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.buyer.is_zero() {
            return Err(ConfigError::Missing("buyer address"));
        }
        if self.channel.seller.is_zero() {
            return Err(ConfigError::Missing("seller address"));
        }
        Ok(())
    }

    pub fn channel_params(&self) -> ChannelParams {
        ChannelParams {
            buyer: self.channel.buyer,
            seller: self.channel.seller,
            unit_price: U256::from(self.channel.unit_price),
            deposit: U256::from(self.channel.deposit),
            deadline_offset: self.channel.deadline_offset_secs,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
