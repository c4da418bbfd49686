//! Opening a planning session from the collaborator providers.
//!
//! All I/O happens here, before the balancer exists. The balancer itself
//! never suspends.

use sluice_core::constants::ChainModel;
use sluice_core::traits::{FeeRateProvider, InputProvider};
use sluice_core::types::{EntryMeta, FeeTier};
use tracing::{info, warn};

use crate::balancer::Balancer;
use crate::error::PlanError;

/// Fetch inputs and fee tiers for `entry` and return a balancer priced at
/// the chosen tier.
///
/// An entry with no spendable inputs opens normally; the empty balancer
/// reports insufficient funds once balanced. Provider failures propagate.
pub async fn open_session(
    entry: EntryMeta,
    change_address: impl Into<String>,
    tier: FeeTier,
    inputs: &dyn InputProvider,
    fees: &dyn FeeRateProvider,
) -> Result<Balancer, PlanError> {
    if entry.chain.model() != ChainModel::Utxo {
        return Err(PlanError::WrongChainModel(entry.chain));
    }

    let spendable = inputs.spendable_inputs(&entry.id).await?;
    let tiers = fees.fee_rates(entry.chain).await?;
    let rate = tiers.tier(tier);

    if spendable.is_empty() {
        warn!(entry = %entry.id, "session: no spendable inputs");
    }
    info!(
        entry = %entry.id,
        chain = %entry.chain,
        inputs = spendable.len(),
        ?tier,
        %rate,
        "session: opened"
    );

    let mut balancer = Balancer::new(entry, change_address, spendable);
    balancer.set_fee_rate(rate);
    Ok(balancer)
}
