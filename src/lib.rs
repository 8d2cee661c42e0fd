//! AEGIS - deterministic policy enforcement for crypto treasuries.
//!
//! This crate normalizes a wallet's holdings and recent transactions from
//! multiple chains/providers into one canonical shape, then evaluates that
//! state against named policy rules to produce an auditable compliance
//! report.

pub mod chains;
pub mod config;
pub mod policy;
pub mod types;

// Re-export main types for convenience
pub use chains::BalanceResolver;
pub use config::ProviderConfig;
pub use policy::{evaluate, ComplianceReport, PolicyRule};
pub use types::{Chain, PortfolioSnapshot, TokenHolding, TransactionRecord};
