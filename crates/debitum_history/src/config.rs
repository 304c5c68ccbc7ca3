//! Settings for the backend contact lookup.

use crate::ids::WalletId;
use crate::storage;
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub base_url: String,
    pub token: String,
    pub wallet_id: WalletId,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = env::var("DEBITUM_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let token = env::var("DEBITUM_TOKEN")
            .map_err(|_| anyhow::anyhow!("DEBITUM_TOKEN is not set"))?;
        let wallet_id = env::var("DEBITUM_WALLET_ID")
            .map_err(|_| anyhow::anyhow!("DEBITUM_WALLET_ID is not set"))?;
        let wallet_id = WalletId::parse(&wallet_id).map_err(anyhow::Error::msg)?;
        let timeout_secs = env::var("DEBITUM_LOOKUP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self {
            base_url: trim_base_url(&base_url),
            token,
            wallet_id,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Base URL set by the host app, token and current wallet from the storage config table.
    pub fn from_storage() -> anyhow::Result<Self> {
        let base_url = crate::get_base_url().ok_or_else(|| anyhow::anyhow!("Backend not configured"))?;
        let token = storage::config_get("token")
            .map_err(anyhow::Error::msg)?
            .ok_or_else(|| anyhow::anyhow!("Not logged in"))?;
        let wallet_id = storage::config_get("current_wallet_id")
            .map_err(anyhow::Error::msg)?
            .ok_or_else(|| anyhow::anyhow!("No wallet selected"))?;
        Ok(Self {
            base_url: trim_base_url(&base_url),
            token,
            wallet_id: WalletId::parse(&wallet_id).map_err(anyhow::Error::msg)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }
}

/// Admin-panel URLs ("…/api/admin") are accepted and cut back to the server root.
fn trim_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    url.strip_suffix("/api/admin").unwrap_or(url).to_string()
}
