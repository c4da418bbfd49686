//! CLI configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sluice_core::amount::Amount;
use sluice_core::constants::Chain;
use sluice_core::types::FeeTier;

#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding `utxos.json` and `fees.json`.
    pub data_dir: PathBuf,
    /// Chain of the planned entry.
    pub chain: Chain,
    /// Fee tier used when no explicit rate is given.
    pub fee_tier: FeeTier,
    /// Override of the chain's no-change threshold, in base units.
    pub dust_threshold: Option<Amount>,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = var("SLUICE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".sluice")
            });

        let chain = var("SLUICE_CHAIN")
            .unwrap_or_else(|| "btc".to_string())
            .parse()
            .context("SLUICE_CHAIN must be one of btc, testbtc, eth, etc, goerli")?;

        let fee_tier = var("SLUICE_FEE_TIER")
            .unwrap_or_else(|| "standard".to_string())
            .parse()
            .context("SLUICE_FEE_TIER must be slow, standard or urgent")?;

        let dust_threshold = var("SLUICE_DUST_THRESHOLD")
            .map(|v| v.parse::<u128>().map(Amount))
            .transpose()
            .context("SLUICE_DUST_THRESHOLD must be a non-negative integer")?;

        let log_json = var("SLUICE_LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Config {
            data_dir,
            chain,
            fee_tier,
            dust_threshold,
            log_json,
        })
    }

    pub fn utxo_file(&self) -> PathBuf {
        self.data_dir.join("utxos.json")
    }

    pub fn fee_file(&self) -> PathBuf {
        self.data_dir.join("fees.json")
    }
}
