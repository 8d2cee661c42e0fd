//! Provider configuration loaded once at startup.

use std::time::Duration;

/// Connection settings for the external data providers.
///
/// A missing Etherscan key disables the EOA reader entirely (it returns no
/// data rather than erroring per request).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub etherscan_api_key: Option<String>,
    pub etherscan_api_url: String,
    pub solana_rpc_url: String,
    pub safe_api_url: String,
    pub coingecko_api_url: String,
    /// Per-request timeout applied to the shared HTTP client.
    pub request_timeout: Duration,
    /// Minimum spacing between successive Etherscan calls
    /// (free tier allows 5 req/s).
    pub min_call_interval: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            etherscan_api_key: None,
            etherscan_api_url: "https://api.etherscan.io/v2/api".to_string(),
            solana_rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            safe_api_url: "https://safe-transaction-mainnet.safe.global/api/v1".to_string(),
            coingecko_api_url: "https://api.coingecko.com/api/v3".to_string(),
            request_timeout: Duration::from_secs(30),
            min_call_interval: Duration::from_millis(250),
        }
    }
}

impl ProviderConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.etherscan_api_key = std::env::var("ETHERSCAN_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        if let Ok(url) = std::env::var("SOLANA_RPC_URL") {
            if !url.is_empty() {
                config.solana_rpc_url = url;
            }
        }
        config
    }
}
