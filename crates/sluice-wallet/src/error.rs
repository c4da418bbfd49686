//! Planner error types.
//!
//! Only caller bugs and broken internal invariants live here. Expected
//! business conditions (insufficient funds, missing destination) are
//! reported as [`ValidationResult`](crate::validation::ValidationResult) data.

use sluice_core::amount::Amount;
use sluice_core::constants::Chain;
use sluice_core::error::ProviderError;
use sluice_core::types::OutPoint;
use thiserror::Error;

/// Errors that can occur while planning a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// `build()` was called before a destination was set.
    #[error("no destination set")]
    MissingDestination,

    /// `build()` was called before a successful `rebalance()`.
    #[error("plan has not been balanced")]
    NotBalanced,

    /// An intermediate amount overflowed or went negative.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// A balanced plan does not spend exactly what it selects.
    #[error("invariant violated: selected {selected} != outputs {outputs} + fee {fee}")]
    InvariantViolation {
        /// Sum of the selected inputs.
        selected: Amount,
        /// Sum of the planned outputs.
        outputs: Amount,
        /// Planned fee.
        fee: Amount,
    },

    /// An input was removed that the balancer does not hold.
    #[error("unknown input: {0}")]
    UnknownInput(OutPoint),

    /// The entry's chain does not use the requested planning model.
    #[error("chain {0} does not support this plan type")]
    WrongChainModel(Chain),

    /// A collaborator failed while opening a session.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
