//! Balancer configuration.
//!
//! Provides [`BalancerConfig`] with per-chain defaults for the no-change
//! threshold, the input sequence policy and same-address output handling.
//! Override individual fields with struct update syntax.

use serde::{Deserialize, Serialize};
use sluice_core::amount::Amount;
use sluice_core::constants::Chain;

/// Tunables for one planning session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BalancerConfig {
    /// Change below this amount is folded into the fee instead of creating
    /// an output. The marginal fee of the change output is always a floor.
    pub dust_threshold: Amount,
    /// Sequence number stamped on every planned input.
    pub sequence: u32,
    /// Merge the change into the send output when both pay the same address.
    pub coalesce_same_address: bool,
}

impl BalancerConfig {
    /// Defaults for a chain.
    pub fn for_chain(chain: Chain) -> Self {
        Self {
            dust_threshold: Amount(chain.dust_threshold()),
            sequence: chain.default_sequence(),
            coalesce_same_address: true,
        }
    }
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self::for_chain(Chain::Bitcoin)
    }
}
