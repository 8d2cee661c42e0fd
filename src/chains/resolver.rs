//! Balance resolver: picks which reader(s) to try for a chain.
//!
//! Fallback is strictly sequential: the secondary reader is only consulted
//! after the primary has signalled unavailability, never speculatively, so
//! one audit never double-bills a provider quota.

use crate::chains::eoa_reader::EoaReader;
use crate::chains::prices::PriceGateway;
use crate::chains::rate_limit::ProviderThrottle;
use crate::chains::safe_reader::SafeReader;
use crate::chains::solana_reader::SolanaReader;
use crate::config::ProviderConfig;
use crate::types::{Chain, PortfolioSnapshot, TransactionRecord};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Entry point for fetching normalized wallet state.
pub struct BalanceResolver {
    safe: SafeReader,
    eoa: EoaReader,
    solana: SolanaReader,
}

impl BalanceResolver {
    /// Wire up all readers against one shared HTTP client.
    pub fn new(http_client: Client, config: &ProviderConfig) -> Self {
        let prices = Arc::new(PriceGateway::new(
            http_client.clone(),
            config.coingecko_api_url.clone(),
        ));

        Self {
            safe: SafeReader::new(
                http_client.clone(),
                Arc::clone(&prices),
                config.safe_api_url.clone(),
            ),
            eoa: EoaReader::new(
                http_client.clone(),
                Arc::clone(&prices),
                ProviderThrottle::new(config.min_call_interval),
                config.etherscan_api_key.clone(),
                config.etherscan_api_url.clone(),
            ),
            solana: SolanaReader::new(http_client, prices, config.solana_rpc_url.clone()),
        }
    }

    /// Fetch a snapshot, trying readers in fallback order.
    ///
    /// Ethereum: Safe first, then EOA. Other EVM chains go straight to the
    /// EOA reader (L2 multisig coverage is out of scope). Solana has a
    /// single tier. `None` means no applicable reader recognized the
    /// address.
    #[instrument(skip(self), fields(address = %address, chain = %chain))]
    pub async fn resolve_balances(
        &self,
        address: &str,
        chain: Chain,
    ) -> Option<PortfolioSnapshot> {
        match chain {
            Chain::Solana => self.solana.fetch_balances(address).await,
            Chain::Ethereum => {
                if let Some(snapshot) = self.safe.fetch_balances(address).await {
                    return Some(snapshot);
                }
                debug!("Not a Safe, falling back to EOA reader");
                self.eoa.fetch_balances(address, chain).await
            }
            _ => self.eoa.fetch_balances(address, chain).await,
        }
    }

    /// Fetch recent transactions with the same tiering as balances.
    #[instrument(skip(self), fields(address = %address, chain = %chain))]
    pub async fn resolve_transactions(
        &self,
        address: &str,
        chain: Chain,
        limit: usize,
    ) -> Option<Vec<TransactionRecord>> {
        match chain {
            Chain::Solana => self.solana.fetch_transactions(address, limit).await,
            Chain::Ethereum => {
                if let Some(txs) = self.safe.fetch_transactions(address, limit).await {
                    return Some(txs);
                }
                debug!("No Safe tx history, falling back to EOA reader");
                self.eoa.fetch_transactions(address, chain, limit).await
            }
            _ => self.eoa.fetch_transactions(address, chain, limit).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_construction() {
        let config = ProviderConfig::default();
        let _resolver = BalanceResolver::new(Client::new(), &config);
    }

    #[tokio::test]
    async fn test_eoa_disabled_without_api_key() {
        // No Etherscan key configured: L2 resolution has no usable tier.
        let mut config = ProviderConfig::default();
        config.etherscan_api_key = None;
        let resolver = BalanceResolver::new(Client::new(), &config);

        let result = resolver
            .resolve_balances("0x0000000000000000000000000000000000000001", Chain::Polygon)
            .await;
        assert!(result.is_none());
    }
}
