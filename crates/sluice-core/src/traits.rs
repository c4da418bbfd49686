//! Collaborator interfaces consumed by the planner.
//!
//! - [`InputProvider`]: spendable outputs of a wallet entry (indexer / RPC)
//! - [`FeeRateProvider`]: network fee estimates at several tiers
//!
//! Both are async because real implementations perform network I/O. The
//! planner only talks to them before a session starts; selection itself is
//! synchronous.

use async_trait::async_trait;

use crate::constants::Chain;
use crate::error::ProviderError;
use crate::types::{EntryId, FeeTiers, SpendableInput};

/// Source of spendable inputs for a wallet entry.
///
/// An empty list means "no funds available" and is not an error. Transient
/// network failures are reported as [`ProviderError`].
#[async_trait]
pub trait InputProvider: Send + Sync {
    async fn spendable_inputs(&self, entry: &EntryId) -> Result<Vec<SpendableInput>, ProviderError>;
}

/// Source of current network fee-rate estimates.
#[async_trait]
pub trait FeeRateProvider: Send + Sync {
    async fn fee_rates(&self, chain: Chain) -> Result<FeeTiers, ProviderError>;
}
