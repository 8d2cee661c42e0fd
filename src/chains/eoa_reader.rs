//! Etherscan-based reader for externally owned accounts.
//!
//! Fallback for Ethereum addresses the Safe service does not recognize,
//! and the primary reader for the L2 chains. Token holdings are discovered
//! by scanning recent ERC-20 transfer events rather than enumerating every
//! contract in existence; discovery is capped so a wallet with thousands of
//! transfers cannot exhaust the provider quota.

use crate::chains::prices::PriceGateway;
use crate::chains::rate_limit::ProviderThrottle;
use crate::chains::safe_reader::is_evm_stablecoin;
use crate::types::{Chain, PortfolioSnapshot, TokenHolding, TransactionRecord};
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Hard cap on distinct token contracts discovered per wallet.
const MAX_TOKENS: usize = 20;

/// How many recent transfer events to scan for token discovery.
const DISCOVERY_WINDOW: usize = 100;

/// Symbol + decimals learned from a transfer event during discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredToken {
    pub contract: String,
    pub symbol: String,
    pub decimals: u32,
}

/// Reader for regular EVM wallets via the Etherscan v2 multichain API.
pub struct EoaReader {
    http_client: Client,
    prices: Arc<PriceGateway>,
    throttle: ProviderThrottle,
    api_key: Option<String>,
    api_url: String,
}

impl EoaReader {
    pub fn new(
        http_client: Client,
        prices: Arc<PriceGateway>,
        throttle: ProviderThrottle,
        api_key: Option<String>,
        api_url: String,
    ) -> Self {
        Self {
            http_client,
            prices,
            throttle,
            api_key,
            api_url,
        }
    }

    async fn etherscan_get(&self, params: &[(&str, String)]) -> Option<Value> {
        let response = match self.http_client.get(&self.api_url).query(params).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Etherscan request failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("Etherscan returned {}", response.status());
            return None;
        }
        match response.json().await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Etherscan response unparseable: {}", e);
                None
            }
        }
    }

    /// Fetch native + ERC-20 balances for a regular EVM address.
    #[instrument(skip(self), fields(address = %address, chain = %chain))]
    pub async fn fetch_balances(&self, address: &str, chain: Chain) -> Option<PortfolioSnapshot> {
        let api_key = match &self.api_key {
            Some(k) => k.clone(),
            None => {
                warn!("ETHERSCAN_API_KEY not set, EOA reader disabled");
                return None;
            }
        };
        let chain_id = chain.etherscan_chain_id()?.to_string();

        // 1. Native balance. A failure here means the provider is
        // unavailable for this address, which is the fallback signal.
        self.throttle.acquire().await;
        let data = self
            .etherscan_get(&[
                ("chainid", chain_id.clone()),
                ("module", "account".to_string()),
                ("action", "balance".to_string()),
                ("address", address.to_string()),
                ("tag", "latest".to_string()),
                ("apikey", api_key.clone()),
            ])
            .await?;

        let native_raw = match lenient_u128(&data["result"]) {
            Some(v) => v,
            None => {
                warn!(
                    "Etherscan balance error for {}: {}",
                    address,
                    data["message"].as_str().unwrap_or("unknown")
                );
                return None;
            }
        };
        let native_balance = native_raw as f64 / 1e18;

        // 2. Native price (ETH-equivalent quote for ETH-denominated L2s).
        let native_price = self.prices.fetch_native_price(chain).await;
        let native_usd = native_balance * native_price;

        let mut tokens = Vec::new();
        let mut total_usd = native_usd;

        if native_balance > 0.0 {
            tokens.push(TokenHolding {
                symbol: chain.native_symbol().to_string(),
                balance: native_balance,
                usd_value: native_usd,
                is_stablecoin: false,
                contract_address: None,
                decimals: 18,
            });
        }

        // 3. Discover held tokens from recent transfer events.
        self.throttle.acquire().await;
        let tx_data = self
            .etherscan_get(&[
                ("chainid", chain_id.clone()),
                ("module", "account".to_string()),
                ("action", "tokentx".to_string()),
                ("address", address.to_string()),
                ("page", "1".to_string()),
                ("offset", DISCOVERY_WINDOW.to_string()),
                ("sort", "desc".to_string()),
                ("apikey", api_key.clone()),
            ])
            .await
            .unwrap_or(Value::Null);

        let discovered = discover_token_contracts(&tx_data);

        // 4. One balance query per discovered contract, throttled.
        for token in discovered {
            self.throttle.acquire().await;
            let bal_data = match self
                .etherscan_get(&[
                    ("chainid", chain_id.clone()),
                    ("module", "account".to_string()),
                    ("action", "tokenbalance".to_string()),
                    ("contractaddress", token.contract.clone()),
                    ("address", address.to_string()),
                    ("tag", "latest".to_string()),
                    ("apikey", api_key.clone()),
                ])
                .await
            {
                Some(v) => v,
                // A single token's failure degrades to omission.
                None => continue,
            };

            let raw_balance = lenient_u128(&bal_data["result"]).unwrap_or(0);
            if raw_balance == 0 {
                continue;
            }

            let balance = raw_balance as f64 / 10f64.powi(token.decimals as i32);
            let is_stablecoin = is_evm_stablecoin(&token.contract);
            let usd_value = if is_stablecoin { balance } else { 0.0 };
            total_usd += usd_value;

            tokens.push(TokenHolding {
                symbol: token.symbol,
                balance,
                usd_value,
                is_stablecoin,
                contract_address: Some(token.contract),
                decimals: token.decimals,
            });
        }

        debug!(
            "EOA {} on {}: ${:.2} across {} tokens",
            address,
            chain,
            total_usd,
            tokens.len()
        );

        Some(PortfolioSnapshot {
            address: address.to_string(),
            chain,
            total_usd,
            native_price_usd: native_price,
            tokens,
        })
    }

    /// Fetch recent transactions, newest first.
    #[instrument(skip(self), fields(address = %address, chain = %chain))]
    pub async fn fetch_transactions(
        &self,
        address: &str,
        chain: Chain,
        limit: usize,
    ) -> Option<Vec<TransactionRecord>> {
        let api_key = self.api_key.as_ref()?.clone();
        let chain_id = chain.etherscan_chain_id()?.to_string();

        self.throttle.acquire().await;
        let data = self
            .etherscan_get(&[
                ("chainid", chain_id),
                ("module", "account".to_string()),
                ("action", "txlist".to_string()),
                ("address", address.to_string()),
                ("page", "1".to_string()),
                ("offset", limit.to_string()),
                ("sort", "desc".to_string()),
                ("apikey", api_key),
            ])
            .await?;

        let rows = data["result"].as_array()?;
        let transactions: Vec<TransactionRecord> =
            rows.iter().filter_map(parse_eoa_transaction).collect();

        debug!("EOA {} on {}: {} transactions", address, chain, transactions.len());
        Some(transactions)
    }
}

/// Parse an Etherscan numeric field, which may be an error string on rate
/// limit or bad-address responses.
fn lenient_u128(value: &Value) -> Option<u128> {
    value.as_str().and_then(|s| s.parse().ok())
}

/// Extract the distinct token contracts seen in a `tokentx` response,
/// newest transfers first, capped at [`MAX_TOKENS`].
pub fn discover_token_contracts(tx_data: &Value) -> Vec<DiscoveredToken> {
    let mut discovered: Vec<DiscoveredToken> = Vec::new();

    if let Some(rows) = tx_data["result"].as_array() {
        for row in rows {
            let contract = match row["contractAddress"].as_str() {
                Some(c) if !c.is_empty() => c.to_lowercase(),
                _ => continue,
            };
            if discovered.iter().any(|t| t.contract == contract) {
                continue;
            }
            discovered.push(DiscoveredToken {
                contract,
                symbol: row["tokenSymbol"].as_str().unwrap_or("???").to_string(),
                decimals: row["tokenDecimal"]
                    .as_str()
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(18),
            });
            if discovered.len() >= MAX_TOKENS {
                break;
            }
        }
    }

    discovered
}

/// Convert one `txlist` row into a normalized record.
pub fn parse_eoa_transaction(row: &Value) -> Option<TransactionRecord> {
    let tx_hash = row["hash"].as_str()?.to_string();
    let native_value_raw = lenient_u128(&row["value"]).unwrap_or(0);

    let execution_timestamp = row["timeStamp"]
        .as_str()
        .and_then(|t| t.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    // "transfer(address to, uint256 value)" -> "transfer"
    let decoded_method = row["functionName"]
        .as_str()
        .and_then(|f| f.split('(').next())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string());

    Some(TransactionRecord {
        execution_timestamp,
        native_value: native_value_raw as f64 / 1e18,
        native_value_raw,
        recipient: row["to"].as_str().map(|t| t.to_string()),
        decoded_method,
        token_contract: None,
        token_value_raw: None,
        is_executed: true,
        tx_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_discovery_dedups_and_normalizes_case() {
        let tx_data = json!({"result": [
            {"contractAddress": "0xAAAA", "tokenSymbol": "AAA", "tokenDecimal": "18"},
            {"contractAddress": "0xaaaa", "tokenSymbol": "AAA", "tokenDecimal": "18"},
            {"contractAddress": "0xBBBB", "tokenSymbol": "BBB", "tokenDecimal": "6"}
        ]});

        let discovered = discover_token_contracts(&tx_data);
        assert_eq!(discovered.len(), 2);
        assert_eq!(discovered[0].contract, "0xaaaa");
        assert_eq!(discovered[1].contract, "0xbbbb");
        assert_eq!(discovered[1].decimals, 6);
    }

    #[test]
    fn test_discovery_caps_at_twenty_contracts() {
        let rows: Vec<Value> = (0..50)
            .map(|i| {
                json!({
                    "contractAddress": format!("0x{:040x}", i),
                    "tokenSymbol": format!("T{}", i),
                    "tokenDecimal": "18"
                })
            })
            .collect();
        let tx_data = json!({"result": rows});

        let discovered = discover_token_contracts(&tx_data);
        assert_eq!(discovered.len(), MAX_TOKENS);
    }

    #[test]
    fn test_discovery_handles_error_payload() {
        // Rate-limited responses carry a string result, not a list.
        let tx_data = json!({"status": "0", "result": "Max rate limit reached"});
        assert!(discover_token_contracts(&tx_data).is_empty());
    }

    #[test]
    fn test_parse_eoa_transaction() {
        let row = json!({
            "hash": "0xabc",
            "value": "1500000000000000000",
            "timeStamp": "1717243200",
            "to": "0xrecipient",
            "functionName": "transfer(address to, uint256 value)"
        });

        let tx = parse_eoa_transaction(&row).unwrap();
        assert_eq!(tx.native_value_raw, 1_500_000_000_000_000_000);
        assert_eq!(tx.native_value, 1.5);
        assert_eq!(tx.decoded_method.as_deref(), Some("transfer"));
        assert!(tx.token_contract.is_none());
        assert!(tx.is_executed);
        assert!(tx.execution_timestamp.is_some());
    }

    #[test]
    fn test_parse_eoa_transaction_plain_transfer() {
        let row = json!({
            "hash": "0xdef",
            "value": "0",
            "timeStamp": "1717243200",
            "to": "0xrecipient",
            "functionName": ""
        });

        let tx = parse_eoa_transaction(&row).unwrap();
        assert!(tx.decoded_method.is_none());
        assert_eq!(tx.native_value_raw, 0);
    }

    #[test]
    fn test_lenient_u128_rejects_error_strings() {
        assert_eq!(lenient_u128(&json!("12345")), Some(12345));
        assert_eq!(lenient_u128(&json!("Max rate limit reached")), None);
        assert_eq!(lenient_u128(&json!(null)), None);
    }
}
