//! Deterministic policy evaluation, the core of the audit engine.
//!
//! `evaluate` is a pure function over `(snapshot, transactions, rules)`:
//! no I/O, no shared state, and degenerate inputs (empty portfolio, missing
//! history, zero total value) always yield a complete report rather than an
//! error. An audit tool must never refuse to render a verdict.
//!
//! Transaction values are estimated with *current* balance-derived unit
//! prices, not prices at execution time. That is a documented approximation
//! carried over intact so downstream consumers keep reproducible semantics.

use crate::policy::enricher::{build_recommendations, rule_metadata};
use crate::policy::types::{
    ComplianceReport, OverallStatus, PolicyRule, RuleKind, RuleResult, Severity,
};
use crate::types::{PortfolioSnapshot, TransactionRecord};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Dust filter for diversification counting: a holding must clear one of
/// these to count as a real position.
const DUST_MIN_USD: f64 = 100.0;
const DUST_MIN_BALANCE: f64 = 0.01;

/// Unit prices derived from a snapshot. The `None` key is the native asset.
pub type PriceMap = HashMap<Option<String>, f64>;

/// Derive USD-per-unit prices from a snapshot's holdings.
///
/// Backward-looking by construction: the map reflects prices *now*, and is
/// applied to historical transactions as an accepted approximation.
pub fn build_price_map(snapshot: &PortfolioSnapshot) -> PriceMap {
    let mut map = PriceMap::new();
    for token in &snapshot.tokens {
        if token.balance > 0.0 {
            map.insert(
                token.contract_address.clone(),
                token.usd_value / token.balance,
            );
        }
    }
    map
}

/// Estimate the USD value of one transaction using snapshot-derived prices.
///
/// Native transfers use the native unit price; decoded ERC-20 transfers
/// resolve decimals from the snapshot's holdings (default 18) and the unit
/// price from the map (default 0 when unpriced). Everything else is $0.
pub fn estimate_tx_usd(
    tx: &TransactionRecord,
    snapshot: &PortfolioSnapshot,
    prices: &PriceMap,
) -> f64 {
    if tx.native_value_raw > 0 {
        return tx.native_value * prices.get(&None).copied().unwrap_or(0.0);
    }

    if let (Some(contract), Some(raw)) = (&tx.token_contract, tx.token_value_raw) {
        let decimals = snapshot
            .tokens
            .iter()
            .find(|t| {
                t.contract_address
                    .as_deref()
                    .map(|a| a.eq_ignore_ascii_case(contract))
                    .unwrap_or(false)
            })
            .map(|t| t.decimals)
            .unwrap_or(18);

        let human_amount = raw as f64 / 10f64.powi(decimals as i32);
        let unit_price = prices
            .get(&Some(contract.to_lowercase()))
            .copied()
            .unwrap_or(0.0);
        return human_amount * unit_price;
    }

    0.0
}

/// Evaluate a wallet snapshot against a rule list.
///
/// Unknown rule-type strings are skipped silently so newer policy files
/// degrade gracefully on older engines.
pub fn evaluate(
    snapshot: &PortfolioSnapshot,
    transactions: Option<&[TransactionRecord]>,
    rules: &[PolicyRule],
) -> ComplianceReport {
    evaluate_at(snapshot, transactions, rules, Utc::now())
}

/// Clock-injected variant of [`evaluate`]; this is the pure, deterministic
/// function (only `inactivity_alert` consults `now`).
pub fn evaluate_at(
    snapshot: &PortfolioSnapshot,
    transactions: Option<&[TransactionRecord]>,
    rules: &[PolicyRule],
    now: DateTime<Utc>,
) -> ComplianceReport {
    let prices = build_price_map(snapshot);
    let mut results = Vec::new();

    for rule in rules {
        let kind = match RuleKind::parse(&rule.rule_type) {
            Some(k) => k,
            None => continue,
        };

        match kind {
            RuleKind::AllocationCap => {
                results.extend(check_allocation_cap(snapshot, rule));
            }
            RuleKind::StablecoinFloor => {
                results.push(check_stablecoin_floor(snapshot, rule));
            }
            RuleKind::SingleAssetCap => {
                results.push(check_single_asset_cap(snapshot, rule));
            }
            RuleKind::MaxTxSize => {
                results.push(check_max_tx_size(snapshot, transactions, &prices, rule));
            }
            RuleKind::InactivityAlert => {
                results.push(check_inactivity(transactions, rule, now));
            }
            RuleKind::MinDiversification => {
                results.push(check_min_diversification(snapshot, rule));
            }
            RuleKind::VolatileExposure => {
                results.push(check_volatile_exposure(snapshot, rule));
            }
            RuleKind::MinTreasuryValue => {
                results.push(check_min_treasury_value(snapshot, rule));
            }
            RuleKind::LargeTxRatio => {
                results.push(check_large_tx_ratio(snapshot, transactions, &prices, rule));
            }
            RuleKind::ConcentrationHhi => {
                results.push(check_concentration_hhi(snapshot, rule));
            }
        }
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    let recommendations = build_recommendations(&results);

    ComplianceReport {
        address: snapshot.address.clone(),
        total_usd: snapshot.total_usd,
        overall_status: if failed == 0 {
            OverallStatus::Compliant
        } else {
            OverallStatus::NonCompliant
        },
        passed,
        failed,
        total_rules: results.len(),
        results,
        recommendations,
    }
}

fn make_result(
    kind: RuleKind,
    passed: bool,
    current_value: String,
    threshold: String,
    severity: Severity,
    detail: String,
) -> RuleResult {
    let info = rule_metadata(kind);
    RuleResult {
        rule: kind.as_str().to_string(),
        passed,
        current_value,
        threshold,
        severity: severity.as_str().to_string(),
        detail,
        name: info.name.to_string(),
        description: info.description.to_string(),
        rationale: info.rationale.to_string(),
    }
}

/// "$1,234,567": rounded to whole dollars with thousands separators.
fn format_usd(value: f64) -> String {
    let negative = value < 0.0;
    let whole = value.abs().round() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Thresholds print without a trailing ".0" ("30", not "30.0").
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

fn check_allocation_cap(snapshot: &PortfolioSnapshot, rule: &PolicyRule) -> Vec<RuleResult> {
    let max_pct = rule.param("max_percent", 30.0);
    let threshold = format!("{}%", format_number(max_pct));
    let total = snapshot.total_usd;

    if total == 0.0 {
        return vec![make_result(
            RuleKind::AllocationCap,
            true,
            "0%".to_string(),
            threshold,
            rule.severity,
            "Portfolio is empty".to_string(),
        )];
    }

    let mut results = Vec::new();
    for token in &snapshot.tokens {
        let pct = token.usd_value / total * 100.0;
        if pct > max_pct {
            results.push(make_result(
                RuleKind::AllocationCap,
                false,
                format!("{:.1}%", pct),
                threshold.clone(),
                rule.severity,
                format!(
                    "{} is {:.1}% of portfolio ({}) - exceeds {}% cap",
                    token.symbol,
                    pct,
                    format_usd(token.usd_value),
                    format_number(max_pct)
                ),
            ));
        }
    }

    if results.is_empty() {
        results.push(make_result(
            RuleKind::AllocationCap,
            true,
            "all within cap".to_string(),
            threshold,
            rule.severity,
            "No single token exceeds allocation cap".to_string(),
        ));
    }
    results
}

fn check_stablecoin_floor(snapshot: &PortfolioSnapshot, rule: &PolicyRule) -> RuleResult {
    let min_pct = rule.param("min_percent", 20.0);
    let threshold = format!("{}%", format_number(min_pct));
    let total = snapshot.total_usd;

    if total == 0.0 {
        return make_result(
            RuleKind::StablecoinFloor,
            true,
            "0%".to_string(),
            threshold,
            rule.severity,
            "Portfolio is empty".to_string(),
        );
    }

    let stable_usd: f64 = snapshot
        .tokens
        .iter()
        .filter(|t| t.is_stablecoin)
        .map(|t| t.usd_value)
        .sum();
    let stable_pct = stable_usd / total * 100.0;
    let passed = stable_pct >= min_pct;

    let mut detail = format!(
        "Stablecoins: {} ({:.1}% of portfolio)",
        format_usd(stable_usd),
        stable_pct
    );
    if !passed {
        detail.push_str(&format!(" - below {}% floor", format_number(min_pct)));
    }

    make_result(
        RuleKind::StablecoinFloor,
        passed,
        format!("{:.1}%", stable_pct),
        threshold,
        rule.severity,
        detail,
    )
}

fn check_single_asset_cap(snapshot: &PortfolioSnapshot, rule: &PolicyRule) -> RuleResult {
    let max_usd = rule.param("max_usd", 500_000.0);
    let threshold = format_usd(max_usd);

    let violators: Vec<_> = snapshot
        .tokens
        .iter()
        .filter(|t| t.usd_value > max_usd)
        .collect();

    if violators.is_empty() {
        return make_result(
            RuleKind::SingleAssetCap,
            true,
            "all within cap".to_string(),
            threshold,
            rule.severity,
            "No single asset exceeds absolute USD cap".to_string(),
        );
    }

    let listing = violators
        .iter()
        .map(|t| format!("{}: {}", t.symbol, format_usd(t.usd_value)))
        .collect::<Vec<_>>()
        .join(", ");

    make_result(
        RuleKind::SingleAssetCap,
        false,
        format!("{} asset(s) over cap", violators.len()),
        threshold,
        rule.severity,
        format!("Over cap: {}", listing),
    )
}

fn check_max_tx_size(
    snapshot: &PortfolioSnapshot,
    transactions: Option<&[TransactionRecord]>,
    prices: &PriceMap,
    rule: &PolicyRule,
) -> RuleResult {
    let max_usd = rule.param("max_usd", 100_000.0);
    let threshold = format_usd(max_usd);

    let txs = match transactions {
        Some(t) => t,
        None => {
            return make_result(
                RuleKind::MaxTxSize,
                true,
                "N/A".to_string(),
                threshold,
                rule.severity,
                "Transaction history unavailable - rule skipped".to_string(),
            );
        }
    };

    if txs.is_empty() {
        return make_result(
            RuleKind::MaxTxSize,
            true,
            "no transactions".to_string(),
            threshold,
            rule.severity,
            "No recent transactions to evaluate".to_string(),
        );
    }

    let mut largest: f64 = 0.0;
    let mut violators = Vec::new();
    for tx in txs {
        let estimated = estimate_tx_usd(tx, snapshot, prices);
        if estimated > largest {
            largest = estimated;
        }
        if estimated > max_usd {
            violators.push((tx, estimated));
        }
    }

    if violators.is_empty() {
        return make_result(
            RuleKind::MaxTxSize,
            true,
            format!("largest tx {}", format_usd(largest)),
            threshold,
            rule.severity,
            "No recent transaction exceeds the size cap".to_string(),
        );
    }

    let listing = violators
        .iter()
        .map(|(tx, est)| format!("{} ({})", short_hash(&tx.tx_hash), format_usd(*est)))
        .collect::<Vec<_>>()
        .join(", ");

    make_result(
        RuleKind::MaxTxSize,
        false,
        format!("largest tx {}", format_usd(largest)),
        threshold,
        rule.severity,
        format!(
            "{} transaction(s) exceed {} cap: {}",
            violators.len(),
            format_usd(max_usd),
            listing
        ),
    )
}

fn check_inactivity(
    transactions: Option<&[TransactionRecord]>,
    rule: &PolicyRule,
    now: DateTime<Utc>,
) -> RuleResult {
    let threshold_hours = rule.param("threshold_hours", 168.0);
    let threshold = format!("{}h", format_number(threshold_hours));

    let txs = match transactions {
        Some(t) => t,
        None => {
            return make_result(
                RuleKind::InactivityAlert,
                true,
                "N/A".to_string(),
                threshold,
                rule.severity,
                "Transaction history unavailable - rule skipped".to_string(),
            );
        }
    };

    // A fetched-but-empty (or undated) history is a failure: the provider
    // answered and it shows no recent activity to point at.
    let last = txs.iter().filter_map(|t| t.execution_timestamp).max();
    let last = match last {
        Some(ts) => ts,
        None => {
            return make_result(
                RuleKind::InactivityAlert,
                false,
                "no transactions found".to_string(),
                threshold,
                rule.severity,
                "No transactions found - wallet may be inactive".to_string(),
            );
        }
    };

    let hours_since = (now - last).num_seconds() as f64 / 3600.0;
    let passed = hours_since <= threshold_hours;

    let mut detail = format!("Last transaction {:.1}h ago", hours_since);
    if !passed {
        detail.push_str(&format!(
            " - exceeds {}h inactivity threshold",
            format_number(threshold_hours)
        ));
    }

    make_result(
        RuleKind::InactivityAlert,
        passed,
        format!("{:.1}h ago", hours_since),
        threshold,
        rule.severity,
        detail,
    )
}

fn check_min_diversification(snapshot: &PortfolioSnapshot, rule: &PolicyRule) -> RuleResult {
    let min_tokens = rule.param("min_tokens", 3.0);
    let threshold = format!("{} assets", format_number(min_tokens));

    let count = snapshot
        .tokens
        .iter()
        .filter(|t| t.usd_value > DUST_MIN_USD || t.balance > DUST_MIN_BALANCE)
        .count();
    let passed = (count as f64) >= min_tokens;

    let mut detail = format!("{} non-dust asset(s) held", count);
    if !passed {
        detail.push_str(&format!(" - below minimum of {}", format_number(min_tokens)));
    }

    make_result(
        RuleKind::MinDiversification,
        passed,
        format!("{} asset(s)", count),
        threshold,
        rule.severity,
        detail,
    )
}

fn check_volatile_exposure(snapshot: &PortfolioSnapshot, rule: &PolicyRule) -> RuleResult {
    let max_pct = rule.param("max_percent", 80.0);
    let threshold = format!("{}%", format_number(max_pct));
    let total = snapshot.total_usd;

    if total == 0.0 {
        return make_result(
            RuleKind::VolatileExposure,
            true,
            "0%".to_string(),
            threshold,
            rule.severity,
            "Portfolio is empty".to_string(),
        );
    }

    let stable_usd: f64 = snapshot
        .tokens
        .iter()
        .filter(|t| t.is_stablecoin)
        .map(|t| t.usd_value)
        .sum();
    let volatile_pct = 100.0 - stable_usd / total * 100.0;
    let passed = volatile_pct <= max_pct;

    let mut detail = format!(
        "Volatile (non-stablecoin) exposure: {:.1}% of portfolio",
        volatile_pct
    );
    if !passed {
        detail.push_str(&format!(" - exceeds {}% limit", format_number(max_pct)));
    }

    make_result(
        RuleKind::VolatileExposure,
        passed,
        format!("{:.1}%", volatile_pct),
        threshold,
        rule.severity,
        detail,
    )
}

fn check_min_treasury_value(snapshot: &PortfolioSnapshot, rule: &PolicyRule) -> RuleResult {
    let min_usd = rule.param("min_usd", 100_000.0);
    let threshold = format_usd(min_usd);
    let passed = snapshot.total_usd >= min_usd;

    let mut detail = format!("Treasury value {}", format_usd(snapshot.total_usd));
    if !passed {
        detail.push_str(&format!(" - below {} minimum", format_usd(min_usd)));
    }

    make_result(
        RuleKind::MinTreasuryValue,
        passed,
        format_usd(snapshot.total_usd),
        threshold,
        rule.severity,
        detail,
    )
}

fn check_large_tx_ratio(
    snapshot: &PortfolioSnapshot,
    transactions: Option<&[TransactionRecord]>,
    prices: &PriceMap,
    rule: &PolicyRule,
) -> RuleResult {
    let max_pct = rule.param("max_percent", 15.0);
    let threshold = format!("{}%", format_number(max_pct));
    let total = snapshot.total_usd;

    let txs = match transactions {
        Some(t) if total > 0.0 => t,
        _ => {
            return make_result(
                RuleKind::LargeTxRatio,
                true,
                "N/A".to_string(),
                threshold,
                rule.severity,
                "Transaction history unavailable or portfolio empty - rule skipped".to_string(),
            );
        }
    };

    let mut largest_pct: f64 = 0.0;
    let mut violators = Vec::new();
    for tx in txs {
        let pct = estimate_tx_usd(tx, snapshot, prices) / total * 100.0;
        if pct > largest_pct {
            largest_pct = pct;
        }
        if pct > max_pct {
            violators.push((tx, pct));
        }
    }

    if violators.is_empty() {
        return make_result(
            RuleKind::LargeTxRatio,
            true,
            format!("largest {:.1}%", largest_pct),
            threshold,
            rule.severity,
            "No recent transaction is large relative to holdings".to_string(),
        );
    }

    let listing = violators
        .iter()
        .map(|(tx, pct)| format!("{} ({:.1}%)", short_hash(&tx.tx_hash), pct))
        .collect::<Vec<_>>()
        .join(", ");

    make_result(
        RuleKind::LargeTxRatio,
        false,
        format!("largest {:.1}%", largest_pct),
        threshold,
        rule.severity,
        format!(
            "{} transaction(s) exceed {}% of holdings: {}",
            violators.len(),
            format_number(max_pct),
            listing
        ),
    )
}

fn check_concentration_hhi(snapshot: &PortfolioSnapshot, rule: &PolicyRule) -> RuleResult {
    let max_hhi = rule.param("max_hhi", 3000.0);
    let threshold = format!("HHI {}", format_number(max_hhi));
    let total = snapshot.total_usd;

    let hhi: i64 = if total == 0.0 {
        0
    } else {
        snapshot
            .tokens
            .iter()
            .map(|t| {
                let share = t.usd_value / total * 100.0;
                share * share
            })
            .sum::<f64>()
            .round() as i64
    };

    let label = if hhi < 1500 {
        "diversified"
    } else if hhi <= 2500 {
        "moderate"
    } else {
        "concentrated"
    };
    let passed = (hhi as f64) <= max_hhi;

    let mut detail = format!("HHI {} ({} portfolio)", hhi, label);
    if !passed {
        detail.push_str(&format!(
            " - exceeds {} threshold",
            format_number(max_hhi)
        ));
    }

    make_result(
        RuleKind::ConcentrationHhi,
        passed,
        format!("HHI {}", hhi),
        threshold,
        rule.severity,
        detail,
    )
}

fn short_hash(hash: &str) -> String {
    if hash.len() > 10 {
        format!("{}...", &hash[..10])
    } else {
        hash.to_string()
    }
}
