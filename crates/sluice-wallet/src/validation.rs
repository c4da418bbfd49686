//! Plan validation.
//!
//! [`validate`] is a pure function of a [`PlanSnapshot`]. Checks run in a
//! fixed priority order and the first failure is the only one reported:
//!
//! 1. destination set and non-empty
//! 2. amount strictly positive
//! 3. at least one selected input
//! 4. `selected >= outputs + fee`

use std::fmt;

use serde::{Deserialize, Serialize};
use sluice_core::amount::Amount;

/// Outcome of validating a plan.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    Ok,
    NoDestination,
    NonPositiveAmount,
    NoInputs,
    InsufficientFunds,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Ok => "ok",
            Self::NoDestination => "no destination address",
            Self::NonPositiveAmount => "amount must be greater than zero",
            Self::NoInputs => "no inputs selected",
            Self::InsufficientFunds => "insufficient funds",
        };
        f.write_str(msg)
    }
}

/// The parts of a plan the validator looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSnapshot<'a> {
    /// Recipient address, if one was set.
    pub destination: Option<&'a str>,
    /// Amount the user asked to send (derived in send-all mode).
    pub amount: Amount,
    /// The amount is derived from the funds rather than entered.
    pub send_all: bool,
    /// Number of inputs funding the plan.
    pub selected_count: usize,
    /// Sum of the funding inputs.
    pub selected_total: Amount,
    /// Sum of every output, change included.
    pub outputs_total: Amount,
    pub fee: Amount,
}

/// Whether `destination` names an address. Blank strings do not.
pub fn has_destination(destination: Option<&str>) -> bool {
    destination.is_some_and(|d| !d.trim().is_empty())
}

/// Validate a plan snapshot.
pub fn validate(plan: &PlanSnapshot<'_>) -> ValidationResult {
    if !has_destination(plan.destination) {
        return ValidationResult::NoDestination;
    }

    if plan.amount.is_zero() {
        if !plan.send_all {
            return ValidationResult::NonPositiveAmount;
        }
        // A derived zero means the fee consumed all funds.
        return match plan.selected_count {
            0 => ValidationResult::NoInputs,
            _ => ValidationResult::InsufficientFunds,
        };
    }

    if plan.selected_count == 0 {
        return ValidationResult::NoInputs;
    }

    match plan.outputs_total.checked_add(plan.fee) {
        Some(spent) if plan.selected_total >= spent => ValidationResult::Ok,
        _ => ValidationResult::InsufficientFunds,
    }
}
