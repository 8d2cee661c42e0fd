//! Report enrichment: static rule metadata and remediation actions.
//!
//! Pure lookup tables, no I/O. Every result leaves the evaluator carrying
//! its human-readable name/description/rationale, and every failed result
//! earns exactly one remediation recommendation.

use crate::policy::types::{Recommendation, RuleKind, RuleResult};

/// Static human-readable metadata for one rule kind.
#[derive(Debug, Clone, Copy)]
pub struct RuleInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub rationale: &'static str,
}

/// Metadata attached to every result of the given kind.
pub fn rule_metadata(kind: RuleKind) -> RuleInfo {
    match kind {
        RuleKind::AllocationCap => RuleInfo {
            name: "Allocation Cap",
            description: "No single token may exceed a set percentage of the portfolio.",
            rationale: "Concentrated positions expose the treasury to single-asset drawdowns.",
        },
        RuleKind::StablecoinFloor => RuleInfo {
            name: "Stablecoin Floor",
            description: "Stablecoins must make up at least a set percentage of the portfolio.",
            rationale: "A stable reserve keeps payroll and obligations fundable through volatility.",
        },
        RuleKind::SingleAssetCap => RuleInfo {
            name: "Single Asset Cap",
            description: "No single asset may exceed an absolute USD value.",
            rationale: "Caps the dollar amount at risk in any one position regardless of portfolio size.",
        },
        RuleKind::MaxTxSize => RuleInfo {
            name: "Max Transaction Size",
            description: "No recent transaction may exceed an absolute USD value.",
            rationale: "Large single transfers are the signature of key compromise or governance capture.",
        },
        RuleKind::InactivityAlert => RuleInfo {
            name: "Inactivity Alert",
            description: "The wallet must have transacted within a set number of hours.",
            rationale: "A silent treasury can mean lost keys or an abandoned multisig quorum.",
        },
        RuleKind::MinDiversification => RuleInfo {
            name: "Minimum Diversification",
            description: "The portfolio must hold at least a set number of non-dust assets.",
            rationale: "Diversification limits the damage any one asset failure can do.",
        },
        RuleKind::VolatileExposure => RuleInfo {
            name: "Volatile Exposure",
            description: "Non-stablecoin holdings may not exceed a set percentage of the portfolio.",
            rationale: "Bounds how much of the treasury rides on market beta.",
        },
        RuleKind::MinTreasuryValue => RuleInfo {
            name: "Minimum Treasury Value",
            description: "Total holdings must stay above an absolute USD value.",
            rationale: "Falling below the runway floor warrants attention before obligations are missed.",
        },
        RuleKind::LargeTxRatio => RuleInfo {
            name: "Large Transaction Ratio",
            description: "No recent transaction may exceed a set percentage of total holdings.",
            rationale: "A transfer that is large relative to the treasury deserves scrutiny even if its dollar size is modest.",
        },
        RuleKind::ConcentrationHhi => RuleInfo {
            name: "Concentration (HHI)",
            description: "The Herfindahl-Hirschman index of holdings must stay below a set level.",
            rationale: "HHI catches creeping concentration that per-token caps can miss.",
        },
    }
}

/// Deterministic remediation text per rule kind, with a generic fallback
/// for rule-type strings this engine does not know.
pub fn remediation_action(rule: &str) -> String {
    let action = match RuleKind::parse(rule) {
        Some(RuleKind::AllocationCap) => {
            "Rebalance the flagged token(s) below the allocation cap, e.g. by swapping into stablecoins."
        }
        Some(RuleKind::StablecoinFloor) => {
            "Convert volatile holdings into allowlisted stablecoins until the floor is met."
        }
        Some(RuleKind::SingleAssetCap) => {
            "Reduce the oversized position(s) below the absolute USD cap."
        }
        Some(RuleKind::MaxTxSize) => {
            "Review the oversized transaction(s) and consider splitting future transfers or tightening signer policy."
        }
        Some(RuleKind::InactivityAlert) => {
            "Verify signer access and execute a routine transaction to confirm the wallet is operational."
        }
        Some(RuleKind::MinDiversification) => {
            "Spread holdings across additional assets to meet the diversification minimum."
        }
        Some(RuleKind::VolatileExposure) => {
            "Shift part of the volatile allocation into stablecoins to reduce market exposure."
        }
        Some(RuleKind::MinTreasuryValue) => {
            "Top up the treasury or revisit the runway plan; holdings are below the configured floor."
        }
        Some(RuleKind::LargeTxRatio) => {
            "Investigate the flagged transaction(s); transfers this large relative to holdings should be pre-approved."
        }
        Some(RuleKind::ConcentrationHhi) => {
            "Rebalance toward a more even allocation to bring the concentration index down."
        }
        None => "Review this rule's failure and adjust treasury policy or holdings accordingly.",
    };
    action.to_string()
}

/// One recommendation per failed result, in result order.
pub fn build_recommendations(results: &[RuleResult]) -> Vec<Recommendation> {
    results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| Recommendation {
            rule: r.rule.clone(),
            action: remediation_action(&r.rule),
            severity: r.severity.clone(),
        })
        .collect()
}
