//! JSON file-backed input and fee-rate providers.
//!
//! `utxos.json` maps entry ids to their spendable inputs:
//!
//! ```json
//! { "wallet-1": [ { "txid": "<64 hex>", "vout": 0, "address": "bc1q...", "amount": 50000 } ] }
//! ```
//!
//! `fees.json` maps chain codes to fee tiers, in base units per virtual
//! kilobyte for UTXO chains and per unit of gas for account chains:
//!
//! ```json
//! { "btc": { "slow": 1024, "standard": 5120, "urgent": 20480 } }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sluice_core::constants::Chain;
use sluice_core::error::ProviderError;
use sluice_core::traits::{FeeRateProvider, InputProvider};
use sluice_core::types::{EntryId, FeeTiers, SpendableInput};
use tracing::debug;

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ProviderError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProviderError::Unavailable(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| ProviderError::Malformed(format!("{}: {e}", path.display())))
}

/// Inputs read from a `utxos.json` file on every call.
pub struct JsonFileInputs {
    path: PathBuf,
}

impl JsonFileInputs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl InputProvider for JsonFileInputs {
    async fn spendable_inputs(&self, entry: &EntryId) -> Result<Vec<SpendableInput>, ProviderError> {
        let mut entries: HashMap<String, Vec<SpendableInput>> = read_json(&self.path).await?;
        let inputs = entries.remove(entry.as_str()).unwrap_or_default();
        debug!(entry = %entry, count = inputs.len(), "files: loaded inputs");
        Ok(inputs)
    }
}

/// Fee tiers read from a `fees.json` file on every call.
pub struct JsonFileFees {
    path: PathBuf,
}

impl JsonFileFees {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeeRateProvider for JsonFileFees {
    async fn fee_rates(&self, chain: Chain) -> Result<FeeTiers, ProviderError> {
        let mut chains: HashMap<String, FeeTiers> = read_json(&self.path).await?;
        chains.remove(chain.code()).ok_or_else(|| {
            ProviderError::Unavailable(format!("no fee estimates for {chain} in {}", self.path.display()))
        })
    }
}
