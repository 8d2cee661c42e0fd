//! Gnosis Safe multisig reader using the Safe Transaction Service API.
//!
//! Pricing policy is deliberately conservative: the native asset is priced
//! via the gateway, allowlisted stablecoins at exactly $1.00/unit, and every
//! other token at $0.00, since an unverifiable token price must never create
//! false compliance.

use crate::chains::prices::PriceGateway;
use crate::types::{Chain, PortfolioSnapshot, TokenHolding, TransactionRecord};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Ethereum mainnet stablecoin contracts priced at $1.00/unit.
pub const EVM_STABLECOINS: [(&str, &str); 3] = [
    ("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "USDC"),
    ("0xdac17f958d2ee523a2206206994597c13d831ec7", "USDT"),
    ("0x6b175474e89094c44da98b954eedeac495271d0f", "DAI"),
];

pub fn is_evm_stablecoin(contract: &str) -> bool {
    EVM_STABLECOINS
        .iter()
        .any(|(addr, _)| *addr == contract.to_lowercase())
}

/// Reader for Gnosis Safe multisig wallets on Ethereum mainnet.
pub struct SafeReader {
    http_client: Client,
    prices: Arc<PriceGateway>,
    api_url: String,
}

impl SafeReader {
    pub fn new(http_client: Client, prices: Arc<PriceGateway>, api_url: String) -> Self {
        Self {
            http_client,
            prices,
            api_url,
        }
    }

    /// Fetch token balances for a Safe address.
    ///
    /// Returns `None` when the Safe service does not recognize the address
    /// or is unreachable; the resolver treats that as a fallback signal,
    /// not an error.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn fetch_balances(&self, address: &str) -> Option<PortfolioSnapshot> {
        let url = format!("{}/safes/{}/balances/", self.api_url, address);

        let response = match self.http_client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Safe balance request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Safe service returned {} for {}", response.status(), address);
            return None;
        }

        let entries: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Safe balance response unparseable: {}", e);
                return None;
            }
        };

        let native_price = self.prices.fetch_native_price(Chain::Ethereum).await;
        let snapshot = parse_safe_balances(address, &entries, native_price);
        debug!(
            "Safe {}: ${:.2} across {} tokens",
            address,
            snapshot.total_usd,
            snapshot.tokens.len()
        );
        Some(snapshot)
    }

    /// Fetch recent executed multisig transactions, newest first.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn fetch_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Option<Vec<TransactionRecord>> {
        let url = format!("{}/safes/{}/multisig-transactions/", self.api_url, address);

        let response = match self
            .http_client
            .get(&url)
            .query(&[
                ("executed", "true".to_string()),
                ("limit", limit.to_string()),
                ("ordering", "-executionDate".to_string()),
            ])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Safe transaction request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(
                "Safe tx endpoint returned {} for {}",
                response.status(),
                address
            );
            return None;
        }

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Safe transaction response unparseable: {}", e);
                return None;
            }
        };

        let rows = body["results"].as_array()?;
        let transactions: Vec<TransactionRecord> = rows
            .iter()
            .filter_map(parse_multisig_transaction)
            .collect();

        debug!("Safe {}: {} executed transactions", address, transactions.len());
        Some(transactions)
    }
}

/// Build a snapshot from the raw Safe balance entries.
///
/// The native ETH entry carries `tokenAddress: null`; everything else is an
/// ERC-20 row with its own decimals. Rows that do not parse are skipped.
pub fn parse_safe_balances(address: &str, entries: &Value, native_price: f64) -> PortfolioSnapshot {
    let mut tokens = Vec::new();
    let mut total_usd = 0.0;

    if let Some(rows) = entries.as_array() {
        for row in rows {
            let contract = row["tokenAddress"].as_str().map(|a| a.to_lowercase());

            let (symbol, decimals) = match &contract {
                None => ("ETH".to_string(), 18),
                Some(_) => {
                    let info = &row["token"];
                    (
                        info["symbol"].as_str().unwrap_or("UNKNOWN").to_string(),
                        info["decimals"].as_u64().unwrap_or(18) as u32,
                    )
                }
            };

            let raw_balance: u128 = match row["balance"].as_str().and_then(|b| b.parse().ok()) {
                Some(b) => b,
                None => continue,
            };
            let balance = raw_balance as f64 / 10f64.powi(decimals as i32);

            let is_stablecoin = contract.as_deref().map(is_evm_stablecoin).unwrap_or(false);

            let usd_value = match &contract {
                None => balance * native_price,
                Some(_) if is_stablecoin => balance,
                Some(_) => 0.0,
            };
            total_usd += usd_value;

            tokens.push(TokenHolding {
                symbol,
                balance,
                usd_value,
                is_stablecoin,
                contract_address: contract,
                decimals,
            });
        }
    }

    PortfolioSnapshot {
        address: address.to_string(),
        chain: Chain::Ethereum,
        total_usd,
        native_price_usd: native_price,
        tokens,
    }
}

/// Convert one multisig transaction row into a normalized record.
///
/// ERC-20 transfers are recovered from the service's `dataDecoded` field;
/// anything else keeps `token_contract: None`. Unexecuted rows are dropped.
pub fn parse_multisig_transaction(row: &Value) -> Option<TransactionRecord> {
    if !row["isExecuted"].as_bool().unwrap_or(false) {
        return None;
    }

    let tx_hash = row["transactionHash"]
        .as_str()
        .or_else(|| row["safeTxHash"].as_str())?
        .to_string();

    let execution_timestamp = row["executionDate"]
        .as_str()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc));

    let native_value_raw: u128 = row["value"]
        .as_str()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let recipient = row["to"].as_str().map(|t| t.to_string());
    let decoded_method = row["dataDecoded"]["method"].as_str().map(|m| m.to_string());

    // A decoded transfer(address,uint256) means the Safe moved an ERC-20
    // held at the `to` contract; recover the raw amount from the params.
    let (token_contract, token_value_raw) = if decoded_method.as_deref() == Some("transfer") {
        let amount = row["dataDecoded"]["parameters"]
            .as_array()
            .and_then(|params| {
                params
                    .iter()
                    .find(|p| p["name"].as_str() == Some("value"))
                    .and_then(|p| p["value"].as_str())
                    .and_then(|v| v.parse::<u128>().ok())
            });
        match amount {
            Some(a) => (recipient.as_ref().map(|r| r.to_lowercase()), Some(a)),
            None => (None, None),
        }
    } else {
        (None, None)
    };

    Some(TransactionRecord {
        execution_timestamp,
        native_value: native_value_raw as f64 / 1e18,
        native_value_raw,
        recipient,
        decoded_method,
        token_contract,
        token_value_raw,
        is_executed: true,
        tx_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stablecoin_allowlist() {
        assert!(is_evm_stablecoin("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"));
        assert!(is_evm_stablecoin("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"));
        assert!(!is_evm_stablecoin("0x1111111111111111111111111111111111111111"));
    }

    #[test]
    fn test_parse_safe_balances_prices_conservatively() {
        let entries = json!([
            {"tokenAddress": null, "token": null, "balance": "2000000000000000000"},
            {
                "tokenAddress": "0xA0b86991c6218B36c1d19D4a2e9Eb0cE3606eB48",
                "token": {"symbol": "USDC", "decimals": 6},
                "balance": "500000000"
            },
            {
                "tokenAddress": "0x1111111111111111111111111111111111111111",
                "token": {"symbol": "SHITCOIN", "decimals": 18},
                "balance": "1000000000000000000000"
            }
        ]);

        let snapshot = parse_safe_balances("0xSafe", &entries, 2000.0);

        assert_eq!(snapshot.tokens.len(), 3);
        // 2 ETH at $2000
        assert_eq!(snapshot.tokens[0].usd_value, 4000.0);
        assert!(snapshot.tokens[0].contract_address.is_none());
        // 500 USDC at exactly $1
        assert!(snapshot.tokens[1].is_stablecoin);
        assert_eq!(snapshot.tokens[1].usd_value, 500.0);
        assert_eq!(
            snapshot.tokens[1].contract_address.as_deref(),
            Some("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
        );
        // Unknown token priced at $0
        assert_eq!(snapshot.tokens[2].usd_value, 0.0);
        assert_eq!(snapshot.total_usd, 4500.0);
    }

    #[test]
    fn test_parse_safe_balances_skips_malformed_rows() {
        let entries = json!([
            {"tokenAddress": null, "token": null, "balance": "not-a-number"},
            {"tokenAddress": null, "token": null, "balance": "1000000000000000000"}
        ]);

        let snapshot = parse_safe_balances("0xSafe", &entries, 1000.0);
        assert_eq!(snapshot.tokens.len(), 1);
        assert_eq!(snapshot.total_usd, 1000.0);
    }

    #[test]
    fn test_parse_multisig_transfer_decoding() {
        let row = json!({
            "isExecuted": true,
            "transactionHash": "0xabc",
            "executionDate": "2024-06-01T12:00:00Z",
            "value": "0",
            "to": "0xA0b86991c6218B36c1d19D4a2e9Eb0cE3606eB48",
            "dataDecoded": {
                "method": "transfer",
                "parameters": [
                    {"name": "to", "value": "0xRecipient"},
                    {"name": "value", "value": "250000000"}
                ]
            }
        });

        let tx = parse_multisig_transaction(&row).unwrap();
        assert_eq!(tx.decoded_method.as_deref(), Some("transfer"));
        assert_eq!(
            tx.token_contract.as_deref(),
            Some("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
        );
        assert_eq!(tx.token_value_raw, Some(250_000_000));
        assert_eq!(tx.native_value_raw, 0);
        assert!(tx.execution_timestamp.is_some());
    }

    #[test]
    fn test_parse_multisig_non_transfer_has_no_token_contract() {
        let row = json!({
            "isExecuted": true,
            "transactionHash": "0xdef",
            "executionDate": "2024-06-01T12:00:00Z",
            "value": "1000000000000000000",
            "to": "0xSomeContract",
            "dataDecoded": {"method": "approve", "parameters": []}
        });

        let tx = parse_multisig_transaction(&row).unwrap();
        assert_eq!(tx.decoded_method.as_deref(), Some("approve"));
        assert!(tx.token_contract.is_none());
        assert!(tx.token_value_raw.is_none());
        assert_eq!(tx.native_value, 1.0);
    }

    #[test]
    fn test_unexecuted_transactions_are_dropped() {
        let row = json!({
            "isExecuted": false,
            "transactionHash": "0x123",
            "value": "0",
            "to": "0xSomewhere"
        });
        assert!(parse_multisig_transaction(&row).is_none());
    }
}
