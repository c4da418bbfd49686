//! Transfer planning for account-model chains.
//!
//! There is no coin selection: the plan spends from a single balance and
//! pays `gas_limit * gas_price`. In send-all mode the transferred amount is
//! the balance net of that fee.

use sluice_core::amount::Amount;
use sluice_core::constants::ChainModel;
use sluice_core::types::EntryMeta;
use tracing::debug;

use crate::balancer::TargetMode;
use crate::builder::{AccountPlan, TransactionDescriptor};
use crate::error::PlanError;
use crate::validation::{self, PlanSnapshot, ValidationResult};

/// Gas used by a plain value transfer.
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;

/// Planner for one transfer from an account-model entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalancer {
    entry: EntryMeta,
    from: String,
    balance: Amount,
    gas_limit: u64,
    gas_price: Amount,
    mode: TargetMode,
    amount: Amount,
    destination: Option<String>,
}

impl AccountBalancer {
    /// Fails with [`PlanError::WrongChainModel`] for UTXO chains.
    pub fn new(entry: EntryMeta, from: impl Into<String>, balance: Amount) -> Result<Self, PlanError> {
        if entry.chain.model() != ChainModel::Account {
            return Err(PlanError::WrongChainModel(entry.chain));
        }
        Ok(Self {
            entry,
            from: from.into(),
            balance,
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: Amount::ZERO,
            mode: TargetMode::Manual,
            amount: Amount::ZERO,
            destination: None,
        })
    }

    /// Set the transfer amount. Switches to manual mode.
    pub fn set_amount(&mut self, amount: Amount) -> &mut Self {
        self.amount = amount;
        self.mode = TargetMode::Manual;
        self
    }

    pub fn set_gas_price(&mut self, price: Amount) -> &mut Self {
        self.gas_price = price;
        self
    }

    pub fn set_gas_limit(&mut self, limit: u64) -> &mut Self {
        self.gas_limit = limit;
        self
    }

    pub fn set_destination(&mut self, address: impl Into<String>) -> &mut Self {
        self.destination = Some(address.into());
        self
    }

    pub fn set_target_mode(&mut self, mode: TargetMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// `gas_limit * gas_price`.
    pub fn fee(&self) -> Result<Amount, PlanError> {
        self.gas_price
            .checked_mul(self.gas_limit as u128)
            .ok_or(PlanError::ArithmeticOverflow("gas fee"))
    }

    /// The transfer amount; in send-all mode the balance net of the fee,
    /// or zero when the fee exceeds the balance.
    pub fn amount(&self) -> Result<Amount, PlanError> {
        match self.mode {
            TargetMode::Manual => Ok(self.amount),
            TargetMode::SendAll => Ok(self
                .balance
                .checked_sub(self.fee()?)
                .unwrap_or(Amount::ZERO)),
        }
    }

    /// Validate with the balance as the single funding source.
    pub fn validate(&self) -> ValidationResult {
        let (amount, fee) = match (self.amount(), self.fee()) {
            (Ok(amount), Ok(fee)) => (amount, fee),
            // A fee that overflows cannot be funded.
            _ => return ValidationResult::InsufficientFunds,
        };
        validation::validate(&PlanSnapshot {
            destination: self.destination.as_deref(),
            amount,
            send_all: self.mode == TargetMode::SendAll,
            selected_count: usize::from(!self.balance.is_zero()),
            selected_total: self.balance,
            outputs_total: amount,
            fee,
        })
    }

    pub fn build(&self) -> Result<TransactionDescriptor, PlanError> {
        let to = match self.destination.as_deref() {
            Some(d) if validation::has_destination(Some(d)) => d.to_string(),
            _ => return Err(PlanError::MissingDestination),
        };
        let fee = self.fee()?;
        let amount = self.amount()?;
        debug!(
            entry = %self.entry.id,
            amount = %amount,
            fee = %fee,
            "account: built transfer"
        );
        Ok(TransactionDescriptor::Account(AccountPlan {
            entry_id: self.entry.id.clone(),
            from: self.from.clone(),
            to,
            amount,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            fee,
        }))
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn gas_price(&self) -> Amount {
        self.gas_price
    }

    pub fn target_mode(&self) -> TargetMode {
        self.mode
    }
}
