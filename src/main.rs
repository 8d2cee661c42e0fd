//! AEGIS CLI - audit one wallet against a policy file.
//!
//! Exit code 0 means COMPLIANT, 1 means violations were found.

use aegis::chains::BalanceResolver;
use aegis::config::ProviderConfig;
use aegis::policy::{default_rules, evaluate, PolicyRule};
use aegis::types::Chain;
use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn, Level};

/// Deterministic policy validator for crypto treasury wallets.
#[derive(Parser, Debug)]
#[command(name = "aegis", version)]
struct Args {
    /// Wallet address to audit (0x... or base58)
    #[arg(long)]
    address: String,

    /// Chain the wallet lives on
    #[arg(long, default_value = "ethereum")]
    chain: Chain,

    /// Path to a policy JSON file ({"rules": [...]}); built-in defaults
    /// are used when omitted
    #[arg(long)]
    policy: Option<std::path::PathBuf>,

    /// How many recent transactions to evaluate
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    rules: Vec<PolicyRule>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let rules = match &args.policy {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read policy file {}", path.display()))?;
            let document: PolicyDocument =
                serde_json::from_str(&content).context("Invalid policy document")?;
            document.rules
        }
        None => default_rules(),
    };

    let config = ProviderConfig::from_env();
    let http_client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let resolver = BalanceResolver::new(http_client, &config);

    info!("Fetching balances for {} on {}", args.address, args.chain);
    let snapshot = match resolver.resolve_balances(&args.address, args.chain).await {
        Some(s) => s,
        None => bail!(
            "Could not fetch balances for {} on {}",
            args.address,
            args.chain
        ),
    };
    info!(
        "Portfolio: ${:.2} across {} tokens",
        snapshot.total_usd,
        snapshot.tokens.len()
    );

    let transactions = resolver
        .resolve_transactions(&args.address, args.chain, args.limit)
        .await;
    match &transactions {
        Some(txs) => info!("Transactions: {} recent", txs.len()),
        None => warn!("Could not fetch transaction history, some rules will be skipped"),
    }

    let report = evaluate(&snapshot, transactions.as_deref(), &rules);

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", rendered);

    if report.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
