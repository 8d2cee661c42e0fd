//! Spot price gateway backed by CoinGecko's free tier.
//!
//! Every method is best-effort: HTTP failures, non-2xx responses and
//! missing keys all degrade to `0.0` / an empty map. Callers must treat
//! zero as "unpriced", not "worthless". One request per call, no retries,
//! so a single audit's latency stays bounded.

use crate::types::Chain;
use reqwest::Client;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// USD quote source for native assets and token contracts.
pub struct PriceGateway {
    http_client: Client,
    api_url: String,
}

impl PriceGateway {
    pub fn new(http_client: Client, api_url: String) -> Self {
        Self {
            http_client,
            api_url,
        }
    }

    /// Fetch the current USD price of a chain's native asset.
    #[instrument(skip(self))]
    pub async fn fetch_native_price(&self, chain: Chain) -> f64 {
        let asset_id = chain.coingecko_native_id();
        let url = format!("{}/simple/price", self.api_url);

        let response = match self
            .http_client
            .get(&url)
            .query(&[("ids", asset_id), ("vs_currencies", "usd")])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Native price request failed for {}: {}", chain, e);
                return 0.0;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Native price request for {} returned {}",
                chain,
                response.status()
            );
            return 0.0;
        }

        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Native price response unparseable for {}: {}", chain, e);
                return 0.0;
            }
        };

        let price = body[asset_id]["usd"].as_f64().unwrap_or(0.0);
        debug!("Native price for {}: ${}", chain, price);
        price
    }

    /// Batch-fetch USD prices for token contracts on one chain.
    ///
    /// Issues a single request regardless of how many contracts are asked
    /// for. Contracts CoinGecko does not know are simply absent from the
    /// returned map.
    #[instrument(skip(self, contracts), fields(count = contracts.len()))]
    pub async fn fetch_token_prices(
        &self,
        chain: Chain,
        contracts: &[String],
    ) -> HashMap<String, f64> {
        if contracts.is_empty() {
            return HashMap::new();
        }

        let url = format!(
            "{}/simple/token_price/{}",
            self.api_url,
            chain.coingecko_platform()
        );
        let csv = contracts.join(",");

        let response = match self
            .http_client
            .get(&url)
            .query(&[("contract_addresses", csv.as_str()), ("vs_currencies", "usd")])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Token price request failed for {}: {}", chain, e);
                return HashMap::new();
            }
        };

        if !response.status().is_success() {
            warn!(
                "Token price request for {} returned {}",
                chain,
                response.status()
            );
            return HashMap::new();
        }

        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Token price response unparseable for {}: {}", chain, e);
                return HashMap::new();
            }
        };

        let mut prices = HashMap::new();
        if let Some(entries) = body.as_object() {
            for (address, quote) in entries {
                if let Some(usd) = quote["usd"].as_f64() {
                    prices.insert(address.clone(), usd);
                }
            }
        }

        debug!("Priced {}/{} contracts on {}", prices.len(), contracts.len(), chain);
        prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_construction() {
        let gateway = PriceGateway::new(Client::new(), "https://example.invalid".to_string());
        assert!(gateway.api_url.starts_with("https://"));
    }

    #[tokio::test]
    async fn test_empty_contract_list_skips_request() {
        // An unroutable URL proves no request is issued for an empty batch.
        let gateway = PriceGateway::new(Client::new(), "http://127.0.0.1:1".to_string());
        let prices = gateway.fetch_token_prices(Chain::Ethereum, &[]).await;
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_provider_returns_zero() {
        let gateway = PriceGateway::new(Client::new(), "http://127.0.0.1:1".to_string());
        let price = gateway.fetch_native_price(Chain::Ethereum).await;
        assert_eq!(price, 0.0);

        let contracts = vec!["0xdead".to_string()];
        let prices = gateway.fetch_token_prices(Chain::Ethereum, &contracts).await;
        assert!(prices.is_empty());
    }
}
