//! Policy rule and compliance report types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The ten built-in rule kinds.
///
/// Policy documents reference these by their string name; anything else is
/// skipped during evaluation so that newer policy files keep working
/// against older engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    AllocationCap,
    StablecoinFloor,
    SingleAssetCap,
    MaxTxSize,
    InactivityAlert,
    MinDiversification,
    VolatileExposure,
    MinTreasuryValue,
    LargeTxRatio,
    ConcentrationHhi,
}

impl RuleKind {
    /// Returns the string representation used in policy documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::AllocationCap => "allocation_cap",
            RuleKind::StablecoinFloor => "stablecoin_floor",
            RuleKind::SingleAssetCap => "single_asset_cap",
            RuleKind::MaxTxSize => "max_tx_size",
            RuleKind::InactivityAlert => "inactivity_alert",
            RuleKind::MinDiversification => "min_diversification",
            RuleKind::VolatileExposure => "volatile_exposure",
            RuleKind::MinTreasuryValue => "min_treasury_value",
            RuleKind::LargeTxRatio => "large_tx_ratio",
            RuleKind::ConcentrationHhi => "concentration_hhi",
        }
    }

    /// Parse a policy rule-type string; unknown kinds yield `None`.
    pub fn parse(s: &str) -> Option<RuleKind> {
        match s {
            "allocation_cap" => Some(RuleKind::AllocationCap),
            "stablecoin_floor" => Some(RuleKind::StablecoinFloor),
            "single_asset_cap" => Some(RuleKind::SingleAssetCap),
            "max_tx_size" => Some(RuleKind::MaxTxSize),
            "inactivity_alert" => Some(RuleKind::InactivityAlert),
            "min_diversification" => Some(RuleKind::MinDiversification),
            "volatile_exposure" => Some(RuleKind::VolatileExposure),
            "min_treasury_value" => Some(RuleKind::MinTreasuryValue),
            "large_tx_ratio" => Some(RuleKind::LargeTxRatio),
            "concentration_hhi" => Some(RuleKind::ConcentrationHhi),
            _ => None,
        }
    }

    /// Returns all rule kinds.
    pub fn all() -> Vec<RuleKind> {
        vec![
            RuleKind::AllocationCap,
            RuleKind::StablecoinFloor,
            RuleKind::SingleAssetCap,
            RuleKind::MaxTxSize,
            RuleKind::InactivityAlert,
            RuleKind::MinDiversification,
            RuleKind::VolatileExposure,
            RuleKind::MinTreasuryValue,
            RuleKind::LargeTxRatio,
            RuleKind::ConcentrationHhi,
        ]
    }
}

/// How bad a rule failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Warning,
    Breach,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Breach => "breach",
        }
    }
}

/// One rule as authored in a policy document.
///
/// `rule_type` stays a free string so unknown kinds survive round-trips;
/// the evaluator resolves it through [`RuleKind::parse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub params: HashMap<String, f64>,
    #[serde(default)]
    pub severity: Severity,
}

impl PolicyRule {
    pub fn new(kind: RuleKind, params: &[(&str, f64)], severity: Severity) -> Self {
        Self {
            rule_type: kind.as_str().to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            severity,
        }
    }

    pub fn param(&self, name: &str, default: f64) -> f64 {
        self.params.get(name).copied().unwrap_or(default)
    }
}

/// Outcome of evaluating one rule (one rule may emit several).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule: String,
    pub passed: bool,
    pub current_value: String,
    pub threshold: String,
    pub severity: String,
    pub detail: String,
    pub name: String,
    pub description: String,
    pub rationale: String,
}

/// Deterministic remediation suggestion for one failed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rule: String,
    pub action: String,
    pub severity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    #[serde(rename = "COMPLIANT")]
    Compliant,
    #[serde(rename = "NON-COMPLIANT")]
    NonCompliant,
}

/// Full audit verdict for one wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub address: String,
    pub total_usd: f64,
    pub overall_status: OverallStatus,
    pub passed: usize,
    pub failed: usize,
    pub total_rules: usize,
    pub results: Vec<RuleResult>,
    pub recommendations: Vec<Recommendation>,
}

/// The built-in rule set used when a caller audits without a policy.
pub fn default_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::new(RuleKind::AllocationCap, &[("max_percent", 30.0)], Severity::Breach),
        PolicyRule::new(RuleKind::StablecoinFloor, &[("min_percent", 20.0)], Severity::Breach),
        PolicyRule::new(RuleKind::SingleAssetCap, &[("max_usd", 500_000.0)], Severity::Warning),
        PolicyRule::new(RuleKind::MaxTxSize, &[("max_usd", 100_000.0)], Severity::Warning),
        PolicyRule::new(RuleKind::InactivityAlert, &[("threshold_hours", 168.0)], Severity::Warning),
        PolicyRule::new(RuleKind::MinDiversification, &[("min_tokens", 3.0)], Severity::Warning),
        PolicyRule::new(RuleKind::VolatileExposure, &[("max_percent", 80.0)], Severity::Breach),
        PolicyRule::new(RuleKind::MinTreasuryValue, &[("min_usd", 100_000.0)], Severity::Warning),
        PolicyRule::new(RuleKind::LargeTxRatio, &[("max_percent", 15.0)], Severity::Warning),
        PolicyRule::new(RuleKind::ConcentrationHhi, &[("max_hhi", 3000.0)], Severity::Warning),
    ]
}
