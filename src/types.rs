//! Shared data model for the treasury audit engine.
//!
//! Everything a chain reader produces and the policy evaluator consumes
//! lives here, so the evaluator never has to branch on chain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported blockchains. Closed set; the resolver dispatches on this
/// exhaustively rather than on raw chain-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Bsc,
    Base,
    Arbitrum,
    Polygon,
    Solana,
}

impl Chain {
    /// Returns the string representation of the chain for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Bsc => "bsc",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Polygon => "polygon",
            Chain::Solana => "solana",
        }
    }

    /// Returns all supported chains.
    pub fn all() -> Vec<Chain> {
        vec![
            Chain::Ethereum,
            Chain::Bsc,
            Chain::Base,
            Chain::Arbitrum,
            Chain::Polygon,
            Chain::Solana,
        ]
    }

    pub fn is_evm(&self) -> bool {
        !matches!(self, Chain::Solana)
    }

    /// Ticker of the chain's native asset.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum | Chain::Base | Chain::Arbitrum => "ETH",
            Chain::Bsc => "BNB",
            Chain::Polygon => "POL",
            Chain::Solana => "SOL",
        }
    }

    /// Decimals of the native asset (wei vs lamports).
    pub fn native_decimals(&self) -> u32 {
        match self {
            Chain::Solana => 9,
            _ => 18,
        }
    }

    /// Chain id used by the Etherscan v2 multichain API.
    /// Solana has no Etherscan coverage.
    pub fn etherscan_chain_id(&self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::Bsc => Some(56),
            Chain::Base => Some(8453),
            Chain::Arbitrum => Some(42161),
            Chain::Polygon => Some(137),
            Chain::Solana => None,
        }
    }

    /// CoinGecko asset id for the native token. ETH-denominated L2s price
    /// against the ETH spot quote.
    pub fn coingecko_native_id(&self) -> &'static str {
        match self {
            Chain::Ethereum | Chain::Base | Chain::Arbitrum => "ethereum",
            Chain::Bsc => "binancecoin",
            Chain::Polygon => "polygon-ecosystem-token",
            Chain::Solana => "solana",
        }
    }

    /// CoinGecko platform slug for token-contract price lookups.
    pub fn coingecko_platform(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Bsc => "binance-smart-chain",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum-one",
            Chain::Polygon => "polygon-pos",
            Chain::Solana => "solana",
        }
    }
}

impl FromStr for Chain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" => Ok(Chain::Ethereum),
            "bsc" => Ok(Chain::Bsc),
            "base" => Ok(Chain::Base),
            "arbitrum" => Ok(Chain::Arbitrum),
            "polygon" => Ok(Chain::Polygon),
            "solana" => Ok(Chain::Solana),
            other => Err(anyhow::anyhow!("unknown chain: {}", other)),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asset held by a wallet, normalized across chains.
///
/// EVM contract addresses are lowercase-normalized; Solana mints keep their
/// base58 casing. The native asset carries `contract_address: None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHolding {
    pub symbol: String,
    pub balance: f64,
    pub usd_value: f64,
    pub is_stablecoin: bool,
    pub contract_address: Option<String>,
    pub decimals: u32,
}

/// Point-in-time normalized holdings of one address on one chain.
///
/// Constructed fresh per audit request and never mutated afterwards;
/// `total_usd` equals the sum of token USD values within float rounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub address: String,
    pub chain: Chain,
    pub total_usd: f64,
    pub native_price_usd: f64,
    pub tokens: Vec<TokenHolding>,
}

/// One historical transaction, uniform across chains.
///
/// Solana records carry only signature + timestamp; their value fields are
/// always zero because the reader never fetches per-transaction detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub execution_timestamp: Option<DateTime<Utc>>,
    /// Native amount in whole units (ETH, not wei).
    pub native_value: f64,
    /// Native amount in the chain's smallest unit.
    pub native_value_raw: u128,
    pub recipient: Option<String>,
    pub decoded_method: Option<String>,
    /// Set only for decoded ERC-20 `transfer(address,uint256)` calls.
    pub token_contract: Option<String>,
    pub token_value_raw: Option<u128>,
    pub is_executed: bool,
    pub tx_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_round_trip() {
        for chain in Chain::all() {
            let parsed: Chain = chain.as_str().parse().unwrap();
            assert_eq!(parsed, chain);
        }
    }

    #[test]
    fn test_chain_parse_is_case_insensitive() {
        let chain: Chain = "Ethereum".parse().unwrap();
        assert_eq!(chain, Chain::Ethereum);
    }

    #[test]
    fn test_chain_parse_rejects_unknown() {
        assert!("dogechain".parse::<Chain>().is_err());
    }

    #[test]
    fn test_native_symbols() {
        assert_eq!(Chain::Ethereum.native_symbol(), "ETH");
        assert_eq!(Chain::Bsc.native_symbol(), "BNB");
        assert_eq!(Chain::Polygon.native_symbol(), "POL");
        assert_eq!(Chain::Base.native_symbol(), "ETH");
        assert_eq!(Chain::Solana.native_symbol(), "SOL");
    }

    #[test]
    fn test_etherscan_chain_ids() {
        assert_eq!(Chain::Ethereum.etherscan_chain_id(), Some(1));
        assert_eq!(Chain::Arbitrum.etherscan_chain_id(), Some(42161));
        assert_eq!(Chain::Solana.etherscan_chain_id(), None);
    }

    #[test]
    fn test_l2_native_price_uses_eth_quote() {
        assert_eq!(Chain::Base.coingecko_native_id(), "ethereum");
        assert_eq!(Chain::Arbitrum.coingecko_native_id(), "ethereum");
        assert_eq!(Chain::Bsc.coingecko_native_id(), "binancecoin");
    }

    #[test]
    fn test_chain_serde_lowercase() {
        let json = serde_json::to_string(&Chain::Arbitrum).unwrap();
        assert_eq!(json, "\"arbitrum\"");
        let back: Chain = serde_json::from_str("\"solana\"").unwrap();
        assert_eq!(back, Chain::Solana);
    }
}
