//! sluice-cli: Offline transaction planning.
//!
//! Reads spendable inputs and fee estimates from JSON files, plans a
//! fee-correct transaction and prints the unsigned descriptor as JSON for
//! an external signer.

mod config;
mod files;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sluice_core::amount::{Amount, Unit};
use sluice_core::constants::{Chain, ChainModel, SEQUENCE_FINAL};
use sluice_core::traits::{FeeRateProvider, InputProvider};
use sluice_core::types::{EntryMeta, FeeRate, FeeTier};
use sluice_wallet::{
    open_session, AccountBalancer, BalanceStatus, Balancer, BalancerConfig, TargetMode,
    TransactionDescriptor, ValidationResult, DEFAULT_GAS_LIMIT,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::files::{JsonFileFees, JsonFileInputs};

/// Sluice offline transaction planner.
#[derive(Parser)]
#[command(name = "sluice-cli")]
#[command(version, about = "Plan fee-correct transactions offline.")]
struct Cli {
    /// Directory holding utxos.json and fees.json (default: $SLUICE_DATA_DIR or ~/.sluice).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Chain code: btc, testbtc, eth, etc or goerli (default: $SLUICE_CHAIN or btc).
    #[arg(long, global = true)]
    chain: Option<Chain>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a transaction and print the unsigned descriptor.
    Plan(PlanArgs),
    /// Show the fee at each network tier for a planned spend.
    Estimate(EstimateArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Wallet entry id.
    #[arg(short, long)]
    entry: String,

    /// Recipient address.
    #[arg(short, long)]
    to: String,

    /// Amount in whole coins (e.g., 0.97).
    #[arg(short, long, conflicts_with = "send_all", required_unless_present = "send_all")]
    amount: Option<String>,

    /// Send everything available, net of the fee.
    #[arg(long)]
    send_all: bool,
}

#[derive(Args)]
struct PlanArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Change address (UTXO chains).
    #[arg(short, long)]
    change: Option<String>,

    /// Sender address (account chains).
    #[arg(long)]
    from: Option<String>,

    /// Account balance in whole coins (account chains).
    #[arg(long)]
    balance: Option<String>,

    /// Fee tier: slow, standard or urgent (default: $SLUICE_FEE_TIER or standard).
    #[arg(long)]
    tier: Option<FeeTier>,

    /// Explicit fee rate overriding the tier: base units per vbyte, or per gas.
    #[arg(long)]
    rate: Option<u64>,

    /// Gas limit (account chains).
    #[arg(long, default_value_t = DEFAULT_GAS_LIMIT)]
    gas_limit: u64,

    #[command(flatten)]
    shape: ShapeArgs,
}

/// Plan shape options shared by `plan` and `estimate`.
#[derive(Args)]
struct ShapeArgs {
    /// Mark inputs final instead of replaceable.
    #[arg(long)]
    final_sequence: bool,

    /// Keep separate send and change outputs when both pay the same address.
    #[arg(long)]
    no_coalesce: bool,
}

#[derive(Args)]
struct EstimateArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Change address.
    #[arg(short, long)]
    change: String,

    /// Also report the rate at which the plan pays this fee, in whole coins.
    #[arg(long)]
    fee: Option<String>,

    #[command(flatten)]
    shape: ShapeArgs,
}

/// Summary printed alongside the descriptor.
#[derive(Serialize)]
struct PlanReport {
    chain: Chain,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<BalanceStatus>,
    validation: ValidationResult,
    amount: String,
    fee: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    change: Option<String>,
    descriptor: TransactionDescriptor,
}

#[derive(Serialize)]
struct TierEstimate {
    tier: FeeTier,
    rate: FeeRate,
    fee: String,
}

#[derive(Serialize)]
struct EstimateReport {
    chain: Chain,
    estimates: Vec<TierEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rate_for_fee: Option<FeeRate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(chain) = cli.chain {
        config.chain = chain;
    }

    init_tracing(config.log_json);

    match cli.command {
        Commands::Plan(args) => match config.chain.model() {
            ChainModel::Utxo => plan_utxo(&config, args).await,
            ChainModel::Account => plan_account(&config, args).await,
        },
        Commands::Estimate(args) => estimate(&config, args).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the JSON report
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Plan a UTXO transaction.
async fn plan_utxo(config: &Config, args: PlanArgs) -> Result<()> {
    let Some(change) = args.change.clone() else {
        bail!("--change is required for {} plans", config.chain);
    };
    let unit = config.chain.unit();
    let entry = EntryMeta::new(args.target.entry.clone(), config.chain);
    let inputs = JsonFileInputs::new(config.utxo_file());

    let balancer = match args.rate {
        Some(per_vbyte) => {
            let spendable = inputs
                .spendable_inputs(&entry.id)
                .await
                .context("Failed to load inputs")?;
            let mut b = Balancer::new(entry, change, spendable);
            b.set_fee_rate(FeeRate::from_per_vbyte(per_vbyte));
            b
        }
        None => {
            let fees = JsonFileFees::new(config.fee_file());
            let tier = args.tier.unwrap_or(config.fee_tier);
            open_session(entry, change, tier, &inputs, &fees)
                .await
                .context("Failed to open planning session")?
        }
    };

    let mut balancer = prepare_balancer(balancer, config, &args.shape, &args.target)?;

    balancer.rebalance().context("Failed to balance plan")?;
    let descriptor = balancer.build().context("Failed to build plan")?;
    let validation = balancer.validate();

    info!(
        status = ?balancer.status(),
        %validation,
        fee = %balancer.current_fee(),
        "plan: built"
    );

    let report = PlanReport {
        chain: config.chain,
        status: Some(balancer.status()),
        validation,
        amount: format_amount(balancer.required_amount(), unit),
        fee: format_amount(balancer.current_fee(), unit),
        change: Some(format_amount(balancer.current_change(), unit)),
        descriptor,
    };
    print_report(&report, validation)
}

/// Plan an account-model transfer.
async fn plan_account(config: &Config, args: PlanArgs) -> Result<()> {
    let Some(from) = args.from else {
        bail!("--from is required for {} plans", config.chain);
    };
    let Some(balance) = args.balance.as_deref() else {
        bail!("--balance is required for {} plans", config.chain);
    };
    let unit = config.chain.unit();
    let balance = parse_amount(balance, unit)?;

    let gas_price = match args.rate {
        Some(price) => Amount::from(price),
        None => {
            let fees = JsonFileFees::new(config.fee_file());
            let tiers = fees
                .fee_rates(config.chain)
                .await
                .context("Failed to load gas prices")?;
            Amount::from(tiers.tier(args.tier.unwrap_or(config.fee_tier)).per_kvb())
        }
    };

    let entry = EntryMeta::new(args.target.entry.clone(), config.chain);
    let mut planner = AccountBalancer::new(entry, from, balance)?;
    planner
        .set_gas_limit(args.gas_limit)
        .set_gas_price(gas_price)
        .set_destination(args.target.to.clone());
    match (&args.target.amount, args.target.send_all) {
        (_, true) => planner.set_target_mode(TargetMode::SendAll),
        (Some(amount), false) => planner.set_amount(parse_amount(amount, unit)?),
        (None, false) => bail!("Either --amount or --send-all is required"),
    };

    let descriptor = planner.build().context("Failed to build transfer")?;
    let validation = planner.validate();

    let report = PlanReport {
        chain: config.chain,
        status: None,
        validation,
        amount: format_amount(planner.amount()?, unit),
        fee: format_amount(planner.fee()?, unit),
        change: None,
        descriptor,
    };
    print_report(&report, validation)
}

/// Price the planned spend at every fee tier.
async fn estimate(config: &Config, args: EstimateArgs) -> Result<()> {
    if config.chain.model() != ChainModel::Utxo {
        bail!("estimate supports UTXO chains only, got {}", config.chain);
    }
    let unit = config.chain.unit();
    let entry = EntryMeta::new(args.target.entry.clone(), config.chain);

    let spendable = JsonFileInputs::new(config.utxo_file())
        .spendable_inputs(&entry.id)
        .await
        .context("Failed to load inputs")?;
    let tiers = JsonFileFees::new(config.fee_file())
        .fee_rates(config.chain)
        .await
        .context("Failed to load fee estimates")?;

    let mut balancer = prepare_balancer(
        Balancer::new(entry, args.change, spendable),
        config,
        &args.shape,
        &args.target,
    )?;
    balancer.set_fee_rate(tiers.tier(config.fee_tier));

    let mut estimates = Vec::new();
    for tier in [FeeTier::Slow, FeeTier::Standard, FeeTier::Urgent] {
        let rate = tiers.tier(tier);
        let fee = balancer.estimate_fee(rate).context("Failed to estimate fee")?;
        estimates.push(TierEstimate {
            tier,
            rate,
            fee: format_amount(fee, unit),
        });
    }

    let rate_for_fee = match args.fee.as_deref() {
        Some(fee) => {
            balancer.rebalance().context("Failed to balance plan")?;
            Some(balancer.estimate_rate(parse_amount(fee, unit)?)?)
        }
        None => None,
    };

    let report = EstimateReport {
        chain: config.chain,
        estimates,
        rate_for_fee,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn balancer_config(config: &Config, shape: &ShapeArgs) -> BalancerConfig {
    let defaults = BalancerConfig::for_chain(config.chain);
    BalancerConfig {
        dust_threshold: config.dust_threshold.unwrap_or(defaults.dust_threshold),
        sequence: if shape.final_sequence {
            SEQUENCE_FINAL
        } else {
            defaults.sequence
        },
        coalesce_same_address: !shape.no_coalesce,
    }
}

/// Apply the configured tunables and the spend target. `plan` and
/// `estimate` both go through here so they price the same plan.
fn prepare_balancer(
    balancer: Balancer,
    config: &Config,
    shape: &ShapeArgs,
    target: &TargetArgs,
) -> Result<Balancer> {
    let mut balancer = balancer.with_config(balancer_config(config, shape));
    apply_target(&mut balancer, target, config.chain.unit())?;
    Ok(balancer)
}

fn apply_target(balancer: &mut Balancer, target: &TargetArgs, unit: Unit) -> Result<()> {
    balancer.set_destination(target.to.clone());
    match (&target.amount, target.send_all) {
        (_, true) => {
            balancer.set_target_mode(TargetMode::SendAll);
        }
        (Some(amount), false) => {
            balancer.set_required_amount(parse_amount(amount, unit)?);
        }
        (None, false) => bail!("Either --amount or --send-all is required"),
    }
    Ok(())
}

fn parse_amount(s: &str, unit: Unit) -> Result<Amount> {
    Amount::parse_decimal(s, unit)
        .with_context(|| format!("Invalid {} amount: {s}", unit.ticker))
}

fn format_amount(amount: Amount, unit: Unit) -> String {
    format!("{} {}", amount.to_decimal_string(unit), unit.ticker)
}

fn print_report(report: &PlanReport, validation: ValidationResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    if !validation.is_ok() {
        bail!("Plan is not valid: {validation}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::types::{OutPoint, SpendableInput, Txid};

    #[test]
    fn parses_plan_command() {
        let cli = Cli::try_parse_from([
            "sluice-cli",
            "--chain",
            "testbtc",
            "plan",
            "--entry",
            "wallet-1",
            "--to",
            "tb1qdest",
            "--amount",
            "0.001",
            "--change",
            "tb1qchange",
            "--tier",
            "urgent",
        ])
        .unwrap();
        assert_eq!(cli.chain, Some(Chain::BitcoinTestnet));
        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.target.amount.as_deref(), Some("0.001"));
                assert_eq!(args.tier, Some(FeeTier::Urgent));
                assert_eq!(args.gas_limit, DEFAULT_GAS_LIMIT);
                assert!(!args.target.send_all);
            }
            Commands::Estimate(_) => panic!("expected plan"),
        }
    }

    #[test]
    fn amount_and_send_all_conflict() {
        let res = Cli::try_parse_from([
            "sluice-cli", "plan", "-e", "w", "-t", "to", "-a", "1", "--send-all",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn amount_or_send_all_required() {
        let res = Cli::try_parse_from(["sluice-cli", "plan", "-e", "w", "-t", "to"]);
        assert!(res.is_err());
    }

    #[test]
    fn rejects_unknown_chain_flag() {
        let res = Cli::try_parse_from([
            "sluice-cli", "--chain", "doge", "estimate", "-e", "w", "-t", "to", "-a", "1", "-c", "c",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn formats_with_ticker() {
        assert_eq!(format_amount(Amount(97_000_000), Unit::BTC), "0.97 BTC");
        assert_eq!(parse_amount("0.0001", Unit::BTC).unwrap(), Amount(10_000));
        assert!(parse_amount("1.000000001", Unit::BTC).is_err());
    }

    #[test]
    fn config_from_flags() {
        let cli = Cli::try_parse_from([
            "sluice-cli", "plan", "-e", "w", "-t", "to", "--send-all", "-c", "c",
            "--final-sequence", "--no-coalesce",
        ])
        .unwrap();
        let config = Config::from_lookup(|_| None).unwrap();
        let Commands::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        let cfg = balancer_config(&config, &args.shape);
        assert_eq!(cfg.sequence, SEQUENCE_FINAL);
        assert!(!cfg.coalesce_same_address);
        assert_eq!(cfg.dust_threshold, BalancerConfig::default().dust_threshold);
    }

    #[test]
    fn estimate_and_plan_price_alike_with_dust_override() {
        let config = Config::from_lookup(|key| {
            (key == "SLUICE_DUST_THRESHOLD").then(|| "10000".to_string())
        })
        .unwrap();
        let spendable = || {
            vec![SpendableInput::new(
                OutPoint::new(Txid([1; 32]), 0),
                "addr1",
                Amount(100_000),
            )]
        };
        let entry = || EntryMeta::new("w", Chain::Bitcoin);
        let rate = FeeRate::from_per_vbyte(10);

        let plan = Cli::try_parse_from([
            "sluice-cli", "plan", "-e", "w", "-t", "to", "-a", "0.0009", "-c", "c",
        ])
        .unwrap();
        let Commands::Plan(plan) = plan.command else {
            panic!("expected plan");
        };
        let mut planned = prepare_balancer(
            Balancer::new(entry(), "c", spendable()),
            &config,
            &plan.shape,
            &plan.target,
        )
        .unwrap();
        planned.set_fee_rate(rate);
        planned.rebalance().unwrap();

        let estimate = Cli::try_parse_from([
            "sluice-cli", "estimate", "-e", "w", "-t", "to", "-a", "0.0009", "-c", "c",
        ])
        .unwrap();
        let Commands::Estimate(estimate) = estimate.command else {
            panic!("expected estimate");
        };
        let estimated = prepare_balancer(
            Balancer::new(entry(), estimate.change.clone(), spendable()),
            &config,
            &estimate.shape,
            &estimate.target,
        )
        .unwrap();

        // 8000 sat of change is under the 10000 override and goes to the fee
        assert_eq!(planned.current_fee(), Amount(10_000));
        assert_eq!(estimated.estimate_fee(rate).unwrap(), planned.current_fee());
    }
}
