use anyhow::{Context, Result};
use ethers::types::Address;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    // Provider
    pub ws_url: String,

    // Deployments
    pub token_address: Address,
    pub exchange_address: Address,

    // Wallet
    pub private_key: String,

    // Read-path bounds
    pub fetch_attempts: u32,
    pub fetch_timeout_secs: u64,

    // Mode
    pub log_level: String,
    pub summary_interval_secs: u64,

    // Alerts
    pub discord_webhook: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            // Provider
            ws_url: env::var("NEX_WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:8545".to_string()),

            // Deployments
            token_address: env::var("NEX_TOKEN_ADDRESS")
                .context("NEX_TOKEN_ADDRESS not set")?
                .parse()
                .context("Invalid NEX_TOKEN_ADDRESS")?,
            exchange_address: env::var("NEX_EXCHANGE_ADDRESS")
                .context("NEX_EXCHANGE_ADDRESS not set")?
                .parse()
                .context("Invalid NEX_EXCHANGE_ADDRESS")?,

            // Wallet
            private_key: env::var("PRIVATE_KEY").context("PRIVATE_KEY not set")?,

            // Read-path bounds
            fetch_attempts: env::var("FETCH_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid FETCH_ATTEMPTS")?,
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid FETCH_TIMEOUT_SECS")?,

            // Mode
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            summary_interval_secs: env::var("SUMMARY_INTERVAL_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid SUMMARY_INTERVAL_SECS")?,

            // Alerts
            discord_webhook: env::var("DISCORD_WEBHOOK").ok(),
        })
    }
}
