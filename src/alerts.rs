use anyhow::Result;
use ethers::types::Address;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, warn};

/// User-facing alert surface. Every alert lands in the log; with a
/// webhook configured it is mirrored to Discord as well.
pub struct AlertClient {
    client: Client,
    webhook_url: Option<String>,
    enabled: bool,
}

impl AlertClient {
    pub fn new(webhook_url: Option<String>) -> Self {
        let enabled = webhook_url.is_some();
        Self {
            client: Client::new(),
            webhook_url,
            enabled,
        }
    }

    async fn send(&self, content: &str, color: u32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let url = match &self.webhook_url {
            Some(u) => u,
            None => return Ok(()),
        };

        let payload = json!({
            "embeds": [{
                "description": content,
                "color": color
            }]
        });

        match self.client.post(url).json(&payload).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to send Discord alert: {}", e);
                Ok(()) // Alerts never take the client down
            }
        }
    }

    /// Alert: session started
    pub async fn session_started(&self, account: Address) {
        info!("Session started for {:?}", account);
        let msg = format!("**NEX terminal started**\nAccount: {account:?}");
        let _ = self.send(&msg, 0x00FF00).await; // Green
    }

    /// Alert: contracts missing on the connected chain
    pub async fn network_mismatch(&self, chain_id: u64) {
        warn!(
            "Contracts not deployed on chain {}. Select another network in your wallet.",
            chain_id
        );
        let msg = format!(
            "**Wrong network**\nContracts not found on chain {chain_id}. Select another network in your wallet."
        );
        let _ = self.send(&msg, 0xFF0000).await; // Red
    }

    /// Alert: a submitted transaction was rejected
    pub async fn transaction_error(&self, what: &str, err: &(dyn std::fmt::Display + Send + Sync)) {
        error!("{} failed: {}", what, err);
        let msg = format!("**Transaction error**\n{what} failed: {err}");
        let _ = self.send(&msg, 0xFF0000).await; // Red
    }

    /// Alert: a historical fetch gave up; the view stays not-loaded
    pub async fn fetch_degraded(&self, what: &str, err: &(dyn std::fmt::Display + Send + Sync)) {
        warn!("{} degraded: {}", what, err);
        let msg = format!("**Degraded**\n{what} could not load: {err}");
        let _ = self.send(&msg, 0xFFA500).await; // Orange
    }
}
