//! Policy rules, the deterministic evaluator and report enrichment.

pub mod enricher;
pub mod evaluator;
pub mod types;

// Re-export main types
pub use enricher::{build_recommendations, remediation_action, rule_metadata, RuleInfo};
pub use evaluator::{build_price_map, estimate_tx_usd, evaluate, evaluate_at, PriceMap};
pub use types::{
    default_rules, ComplianceReport, OverallStatus, PolicyRule, Recommendation, RuleKind,
    RuleResult, Severity,
};
