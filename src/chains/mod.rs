//! Chain readers and supporting provider plumbing.
//!
//! Each reader normalizes one provider's view of a wallet into the shared
//! `PortfolioSnapshot`/`TransactionRecord` shapes; the resolver layers them
//! into fallback tiers.

pub mod eoa_reader;
pub mod prices;
pub mod rate_limit;
pub mod resolver;
pub mod safe_reader;
pub mod solana_reader;

// Re-export main types
pub use eoa_reader::EoaReader;
pub use prices::PriceGateway;
pub use rate_limit::ProviderThrottle;
pub use resolver::BalanceResolver;
pub use safe_reader::SafeReader;
pub use solana_reader::SolanaReader;
