//! Solana wallet reader over plain JSON-RPC.
//!
//! Stays within public RPC free-tier limits: one call for the native
//! balance, one for all SPL token accounts, and a signatures-only history
//! fetch that never resolves per-transaction detail. As a consequence every
//! Solana transaction record carries zero value fields, which leaves the
//! transaction-size rules inert for Solana wallets (known coverage gap,
//! kept as-is for reproducible reports).

use crate::chains::prices::PriceGateway;
use crate::types::{Chain, PortfolioSnapshot, TokenHolding, TransactionRecord};
use chrono::DateTime;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// SPL Token Program id.
const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Known mainnet stablecoin mints priced at $1.00/unit.
pub const SOLANA_STABLECOINS: [(&str, &str); 2] = [
    ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC"),
    ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT"),
];

fn stablecoin_symbol(mint: &str) -> Option<&'static str> {
    SOLANA_STABLECOINS
        .iter()
        .find(|(addr, _)| *addr == mint)
        .map(|(_, sym)| *sym)
}

/// Reader for Solana wallets.
pub struct SolanaReader {
    http_client: Client,
    prices: Arc<PriceGateway>,
    rpc_url: String,
}

impl SolanaReader {
    pub fn new(http_client: Client, prices: Arc<PriceGateway>, rpc_url: String) -> Self {
        Self {
            http_client,
            prices,
            rpc_url,
        }
    }

    /// Issue one JSON-RPC call, returning the `result` field.
    async fn rpc_call(&self, method: &str, params: Value) -> Option<Value> {
        let response = match self
            .http_client
            .post(&self.rpc_url)
            .json(&json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Solana RPC request failed ({}): {}", method, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Solana RPC ({}) returned {}", method, response.status());
            return None;
        }

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Solana RPC response unparseable ({}): {}", method, e);
                return None;
            }
        };

        if !body["error"].is_null() {
            warn!("Solana RPC error ({}): {}", method, body["error"]);
            return None;
        }
        Some(body["result"].clone())
    }

    /// Fetch SOL + all SPL token balances for a wallet.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn fetch_balances(&self, address: &str) -> Option<PortfolioSnapshot> {
        // Primary call; failure means the wallet is unreadable here.
        let sol_result = self.rpc_call("getBalance", json!([address])).await?;
        let lamports = sol_result["value"].as_u64().unwrap_or(0);
        let sol_balance = lamports as f64 / 1e9;

        let sol_price = self.prices.fetch_native_price(Chain::Solana).await;
        let sol_usd = sol_balance * sol_price;

        let mut tokens = vec![TokenHolding {
            symbol: "SOL".to_string(),
            balance: sol_balance,
            usd_value: sol_usd,
            is_stablecoin: false,
            contract_address: None,
            decimals: 9,
        }];
        let mut total_usd = sol_usd;

        // One call covers every SPL token account the wallet owns.
        let token_result = self
            .rpc_call(
                "getTokenAccountsByOwner",
                json!([
                    address,
                    {"programId": TOKEN_PROGRAM_ID},
                    {"encoding": "jsonParsed"}
                ]),
            )
            .await;

        let mut unpriced_mints = Vec::new();
        if let Some(result) = token_result {
            if let Some(accounts) = result["value"].as_array() {
                for account in accounts {
                    let info = &account["account"]["data"]["parsed"]["info"];
                    let mint = match info["mint"].as_str() {
                        Some(m) => m.to_string(),
                        None => continue,
                    };
                    let amount = &info["tokenAmount"];
                    let balance = match amount["uiAmount"].as_f64() {
                        Some(b) if b > 0.0 => b,
                        _ => continue,
                    };
                    let decimals = amount["decimals"].as_u64().unwrap_or(0) as u32;

                    let (symbol, is_stablecoin) = match stablecoin_symbol(&mint) {
                        Some(sym) => (sym.to_string(), true),
                        None => (format!("{}...", &mint[..mint.len().min(6)]), false),
                    };

                    let usd_value = if is_stablecoin {
                        balance
                    } else {
                        unpriced_mints.push(mint.clone());
                        0.0
                    };
                    total_usd += usd_value;

                    tokens.push(TokenHolding {
                        symbol,
                        balance,
                        usd_value,
                        is_stablecoin,
                        // Base58 mints keep their casing.
                        contract_address: Some(mint),
                        decimals,
                    });
                }
            }
        }

        // One batched quote for everything not on the allowlist; mints the
        // quote omits stay at $0.
        if !unpriced_mints.is_empty() {
            let quotes = self
                .prices
                .fetch_token_prices(Chain::Solana, &unpriced_mints)
                .await;
            for token in tokens.iter_mut() {
                if token.is_stablecoin || token.usd_value > 0.0 {
                    continue;
                }
                if let Some(mint) = &token.contract_address {
                    if let Some(price) = quotes.get(mint) {
                        token.usd_value = token.balance * price;
                        total_usd += token.usd_value;
                    }
                }
            }
        }

        debug!(
            "Solana {}: ${:.2} across {} tokens",
            address,
            total_usd,
            tokens.len()
        );

        Some(PortfolioSnapshot {
            address: address.to_string(),
            chain: Chain::Solana,
            total_usd,
            native_price_usd: sol_price,
            tokens,
        })
    }

    /// Fetch recent transaction signatures, newest first.
    ///
    /// Uses `getSignaturesForAddress` only, so records carry signature and
    /// timestamp but no amounts.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn fetch_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Option<Vec<TransactionRecord>> {
        let result = self
            .rpc_call("getSignaturesForAddress", json!([address, {"limit": limit}]))
            .await?;

        let rows = result.as_array()?;
        let transactions: Vec<TransactionRecord> =
            rows.iter().filter_map(parse_signature_info).collect();

        debug!("Solana {}: {} signatures", address, transactions.len());
        Some(transactions)
    }
}

/// Convert one signature-info row into a normalized (value-less) record.
pub fn parse_signature_info(row: &Value) -> Option<TransactionRecord> {
    let tx_hash = row["signature"].as_str()?.to_string();
    let execution_timestamp = row["blockTime"]
        .as_i64()
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    Some(TransactionRecord {
        execution_timestamp,
        native_value: 0.0,
        native_value_raw: 0,
        recipient: None,
        decoded_method: None,
        token_contract: None,
        token_value_raw: None,
        is_executed: true,
        tx_hash,
    })
}
