//! Largest-first coin selection and fee balancing.
//!
//! Selection is a pure function, [`resolve`], of the candidate inputs and the
//! plan parameters. [`Balancer`] owns the parameters for one session and
//! caches the last [`Resolution`]; every mutator discards it.
//!
//! Candidates are sorted by amount descending, ties broken by outpoint
//! ascending, then accumulated until `total >= required + fee(count, 2)`.
//! A change output survives only when it is worth more than the fee it adds
//! and clears the dust threshold. Otherwise it is folded into the fee.

use std::cmp::max;

use serde::{Deserialize, Serialize};
use sluice_core::amount::Amount;
use sluice_core::types::{EntryId, EntryMeta, FeeRate, OutPoint, SpendableInput};
use tracing::debug;

use crate::builder::OutputRef;
use crate::config::BalancerConfig;
use crate::error::PlanError;
use crate::metric::{FeeMetric, LinearMetric};
use crate::validation::{self, PlanSnapshot, ValidationResult};

/// How the send amount is determined.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// Send the amount set with `set_required_amount`.
    #[default]
    Manual,
    /// Send every available input, net of the fee.
    SendAll,
}

/// Lifecycle of a balancer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    /// No destination, or no amount in manual mode.
    Empty,
    /// A target exists but has not been balanced since the last change.
    Pending,
    /// Inputs cover the outputs and the fee exactly.
    Balanced,
    /// The available inputs cannot cover the target.
    Insufficient,
}

/// Inputs to one run of [`resolve`].
#[derive(Debug, Clone, Copy)]
pub struct PlanParams<'a> {
    /// Manual amount or send-all.
    pub mode: TargetMode,
    /// Send amount in manual mode. Ignored in send-all mode.
    pub required: Amount,
    /// Fee rate in base units per virtual kilobyte.
    pub rate: FeeRate,
    /// Recipient of the send output.
    pub destination: Option<&'a str>,
    /// Address the change output pays.
    pub change_address: &'a str,
    /// Entry stamped on the change output.
    pub entry_id: &'a EntryId,
}

/// Outcome of one selection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// `Balanced` or `Insufficient`.
    pub status: BalanceStatus,
    /// Selected inputs in selection order.
    pub selected: Vec<SpendableInput>,
    /// Send output first, change second.
    pub outputs: Vec<OutputRef>,
    /// Amount sent to the destination (derived in send-all mode).
    pub amount: Amount,
    /// Fee paid, including any change folded into it. Zero when insufficient.
    pub fee: Amount,
    /// Value of the change output, zero when there is none.
    pub change: Amount,
    /// Sum of `selected`.
    pub total: Amount,
}

impl Resolution {
    pub fn is_balanced(&self) -> bool {
        self.status == BalanceStatus::Balanced
    }

    /// Every input selected, nothing spent on fee or change.
    fn insufficient(selected: Vec<SpendableInput>, total: Amount, send: OutputRef) -> Self {
        Self {
            status: BalanceStatus::Insufficient,
            selected,
            amount: send.amount,
            outputs: vec![send],
            fee: Amount::ZERO,
            change: Amount::ZERO,
            total,
        }
    }

    fn check_solvency(&self) -> Result<(), PlanError> {
        let outputs = Amount::checked_sum(self.outputs.iter().map(|o| o.amount))
            .ok_or(PlanError::ArithmeticOverflow("output total"))?;
        let spent = outputs
            .checked_add(self.fee)
            .ok_or(PlanError::ArithmeticOverflow("output total plus fee"))?;
        if spent != self.total {
            return Err(PlanError::InvariantViolation {
                selected: self.total,
                outputs,
                fee: self.fee,
            });
        }
        Ok(())
    }
}

/// Order candidates largest first, ties broken by outpoint.
pub fn sort_candidates(inputs: &[SpendableInput]) -> Vec<&SpendableInput> {
    let mut sorted: Vec<&SpendableInput> = inputs.iter().collect();
    sorted.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.outpoint.cmp(&b.outpoint))
    });
    sorted
}

/// Select inputs and price the plan.
///
/// Insufficient funds are reported in the returned status. Errors are
/// reserved for arithmetic overflow and a balanced plan that fails the
/// solvency check.
pub fn resolve(
    inputs: &[SpendableInput],
    params: &PlanParams<'_>,
    metric: &dyn FeeMetric,
    config: &BalancerConfig,
) -> Result<Resolution, PlanError> {
    let candidates = sort_candidates(inputs);
    let resolution = match params.mode {
        TargetMode::SendAll => resolve_send_all(&candidates, params, metric)?,
        TargetMode::Manual => resolve_manual(&candidates, params, metric, config)?,
    };
    if resolution.is_balanced() {
        resolution.check_solvency()?;
    }
    Ok(resolution)
}

fn resolve_send_all(
    candidates: &[&SpendableInput],
    params: &PlanParams<'_>,
    metric: &dyn FeeMetric,
) -> Result<Resolution, PlanError> {
    let selected: Vec<SpendableInput> = candidates.iter().map(|&input| input.clone()).collect();
    let total = Amount::checked_sum(selected.iter().map(|i| i.amount))
        .ok_or(PlanError::ArithmeticOverflow("selected total"))?;
    let destination = params.destination.unwrap_or_default();
    let fee = metric.fee(selected.len(), 1, params.rate);

    match total.checked_sub(fee) {
        Some(amount) if !amount.is_zero() => Ok(Resolution {
            status: BalanceStatus::Balanced,
            selected,
            outputs: vec![OutputRef::send(destination, amount)],
            amount,
            fee,
            change: Amount::ZERO,
            total,
        }),
        _ => Ok(Resolution::insufficient(
            selected,
            total,
            OutputRef::send(destination, Amount::ZERO),
        )),
    }
}

fn resolve_manual(
    candidates: &[&SpendableInput],
    params: &PlanParams<'_>,
    metric: &dyn FeeMetric,
    config: &BalancerConfig,
) -> Result<Resolution, PlanError> {
    let destination = params.destination.unwrap_or_default();
    let coalesce =
        config.coalesce_same_address && params.destination == Some(params.change_address);
    let shape_outputs = if coalesce { 1 } else { 2 };
    let required = params.required;

    let mut selected: Vec<SpendableInput> = Vec::with_capacity(candidates.len());
    let mut total = Amount::ZERO;

    for &input in candidates {
        selected.push(input.clone());
        total = total
            .checked_add(input.amount)
            .ok_or(PlanError::ArithmeticOverflow("selected total"))?;

        let fee = metric.fee(selected.len(), shape_outputs, params.rate);
        let needed = required
            .checked_add(fee)
            .ok_or(PlanError::ArithmeticOverflow("required amount plus fee"))?;
        if total < needed {
            continue;
        }

        if coalesce {
            // Change and send pay the same address: one output carries both.
            let amount = total
                .checked_sub(fee)
                .ok_or(PlanError::ArithmeticOverflow("coalesced output"))?;
            return Ok(Resolution {
                status: BalanceStatus::Balanced,
                selected,
                outputs: vec![OutputRef::send(destination, amount)],
                amount: required,
                fee,
                change: Amount::ZERO,
                total,
            });
        }

        return settle_change(selected, total, fee, params, metric, config);
    }

    // Inputs exhausted below the fee target: whatever is left over pays the fee.
    match total.checked_sub(required) {
        Some(fee) if !selected.is_empty() => Ok(Resolution {
            status: BalanceStatus::Balanced,
            selected,
            outputs: vec![OutputRef::send(destination, required)],
            amount: required,
            fee,
            change: Amount::ZERO,
            total,
        }),
        _ => Ok(Resolution::insufficient(
            selected,
            total,
            OutputRef::send(destination, required),
        )),
    }
}

/// Decide whether the two-output shape keeps its change output.
fn settle_change(
    selected: Vec<SpendableInput>,
    total: Amount,
    two_output_fee: Amount,
    params: &PlanParams<'_>,
    metric: &dyn FeeMetric,
    config: &BalancerConfig,
) -> Result<Resolution, PlanError> {
    let destination = params.destination.unwrap_or_default();
    let required = params.required;
    let change = total
        .checked_sub(required)
        .and_then(|left| left.checked_sub(two_output_fee))
        .ok_or(PlanError::ArithmeticOverflow("change"))?;

    let one_output_fee = metric.fee(selected.len(), 1, params.rate);
    let change_cost = two_output_fee.saturating_sub(one_output_fee);
    let floor = max(change_cost, config.dust_threshold);

    if !change.is_zero() && change >= floor {
        return Ok(Resolution {
            status: BalanceStatus::Balanced,
            selected,
            outputs: vec![
                OutputRef::send(destination, required),
                OutputRef::change(params.change_address, change, params.entry_id.clone()),
            ],
            amount: required,
            fee: two_output_fee,
            change,
            total,
        });
    }

    // The change is not worth an output; it goes to the fee.
    let fee = total
        .checked_sub(required)
        .ok_or(PlanError::ArithmeticOverflow("fee"))?;
    Ok(Resolution {
        status: BalanceStatus::Balanced,
        selected,
        outputs: vec![OutputRef::send(destination, required)],
        amount: required,
        fee,
        change: Amount::ZERO,
        total,
    })
}

/// Stateful planner for one "compose a transaction" session on a UTXO chain.
///
/// Mutators return `&mut Self` so they can be chained. A mutated balancer is
/// unresolved until the next [`Balancer::rebalance`].
pub struct Balancer {
    entry: EntryMeta,
    change_address: String,
    inputs: Vec<SpendableInput>,
    metric: Box<dyn FeeMetric>,
    config: BalancerConfig,
    mode: TargetMode,
    required: Option<Amount>,
    fee_rate: FeeRate,
    destination: Option<String>,
    resolution: Option<Resolution>,
}

impl Balancer {
    /// New balancer with the chain's default metric and config.
    pub fn new(
        entry: EntryMeta,
        change_address: impl Into<String>,
        inputs: Vec<SpendableInput>,
    ) -> Self {
        let chain = entry.chain;
        Self {
            entry,
            change_address: change_address.into(),
            inputs,
            metric: Box::new(LinearMetric::for_chain(chain)),
            config: BalancerConfig::for_chain(chain),
            mode: TargetMode::Manual,
            required: None,
            fee_rate: FeeRate::ZERO,
            destination: None,
            resolution: None,
        }
    }

    pub fn with_metric(mut self, metric: impl FeeMetric + 'static) -> Self {
        self.metric = Box::new(metric);
        self.resolution = None;
        self
    }

    pub fn with_config(mut self, config: BalancerConfig) -> Self {
        self.config = config;
        self.resolution = None;
        self
    }

    // --- Mutators ---

    /// Set the send amount. Switches the balancer to manual mode.
    pub fn set_required_amount(&mut self, amount: Amount) -> &mut Self {
        self.required = Some(amount);
        self.mode = TargetMode::Manual;
        self.invalidate()
    }

    pub fn set_fee_rate(&mut self, rate: FeeRate) -> &mut Self {
        self.fee_rate = rate;
        self.invalidate()
    }

    pub fn set_destination(&mut self, address: impl Into<String>) -> &mut Self {
        self.destination = Some(address.into());
        self.invalidate()
    }

    pub fn set_target_mode(&mut self, mode: TargetMode) -> &mut Self {
        self.mode = mode;
        self.invalidate()
    }

    /// Add a candidate input. An input with the same outpoint is replaced.
    pub fn add_input(&mut self, input: SpendableInput) -> &mut Self {
        match self
            .inputs
            .iter_mut()
            .find(|existing| existing.outpoint == input.outpoint)
        {
            Some(existing) => *existing = input,
            None => self.inputs.push(input),
        }
        self.invalidate()
    }

    /// Remove a candidate input, returning it.
    pub fn remove_input(&mut self, outpoint: &OutPoint) -> Result<SpendableInput, PlanError> {
        let index = self
            .inputs
            .iter()
            .position(|i| &i.outpoint == outpoint)
            .ok_or(PlanError::UnknownInput(*outpoint))?;
        self.invalidate();
        Ok(self.inputs.remove(index))
    }

    fn invalidate(&mut self) -> &mut Self {
        self.resolution = None;
        self
    }

    // --- Balancing ---

    /// Run selection and cache the result. Returns `true` when balanced.
    pub fn rebalance(&mut self) -> Result<bool, PlanError> {
        let resolution = resolve(
            &self.inputs,
            &self.params(self.fee_rate),
            self.metric.as_ref(),
            &self.config,
        )?;

        if resolution.is_balanced() {
            debug!(
                inputs = resolution.selected.len(),
                outputs = resolution.outputs.len(),
                amount = %resolution.amount,
                fee = %resolution.fee,
                change = %resolution.change,
                "rebalance: balanced"
            );
        } else {
            debug!(
                available = %resolution.total,
                required = %self.required.unwrap_or_default(),
                rate = %self.fee_rate,
                "rebalance: insufficient funds"
            );
        }

        let balanced = resolution.is_balanced();
        self.resolution = Some(resolution);
        Ok(balanced)
    }

    /// Fee the plan would pay at `rate`. Does not touch the cached plan.
    pub fn estimate_fee(&self, rate: FeeRate) -> Result<Amount, PlanError> {
        let trial = resolve(
            &self.inputs,
            &self.params(rate),
            self.metric.as_ref(),
            &self.config,
        )?;
        Ok(trial.fee)
    }

    /// Smallest rate at which the current shape pays `fee`.
    ///
    /// The shape is the cached plan's, or a fresh one at the current rate
    /// when the balancer is unresolved.
    pub fn estimate_rate(&self, fee: Amount) -> Result<FeeRate, PlanError> {
        let (inputs, outputs) = match &self.resolution {
            Some(r) => (r.selected.len(), r.outputs.len()),
            None => {
                let trial = resolve(
                    &self.inputs,
                    &self.params(self.fee_rate),
                    self.metric.as_ref(),
                    &self.config,
                )?;
                (trial.selected.len(), trial.outputs.len())
            }
        };
        Ok(self.metric.rate_for_fee(inputs, outputs, fee))
    }

    /// Validate the current state. An unresolved balancer has no selection.
    pub fn validate(&self) -> ValidationResult {
        let (selected_count, selected_total, outputs_total, fee) = match &self.resolution {
            Some(r) => (
                r.selected.len(),
                r.total,
                r.outputs
                    .iter()
                    .fold(Amount::ZERO, |acc, o| acc.saturating_add(o.amount)),
                r.fee,
            ),
            None => (0, Amount::ZERO, Amount::ZERO, Amount::ZERO),
        };

        validation::validate(&PlanSnapshot {
            destination: self.destination.as_deref(),
            amount: self.required_amount(),
            send_all: self.mode == TargetMode::SendAll,
            selected_count,
            selected_total,
            outputs_total,
            fee,
        })
    }

    fn params(&self, rate: FeeRate) -> PlanParams<'_> {
        PlanParams {
            mode: self.mode,
            required: self.required.unwrap_or_default(),
            rate,
            destination: self.destination.as_deref(),
            change_address: &self.change_address,
            entry_id: &self.entry.id,
        }
    }

    // --- Queries ---

    pub fn status(&self) -> BalanceStatus {
        let has_destination = validation::has_destination(self.destination.as_deref());
        let has_amount = match self.mode {
            TargetMode::Manual => self.required.is_some_and(|a| !a.is_zero()),
            TargetMode::SendAll => true,
        };
        if !has_destination || !has_amount {
            return BalanceStatus::Empty;
        }
        self.resolution
            .as_ref()
            .map_or(BalanceStatus::Pending, |r| r.status)
    }

    /// The send amount: as set in manual mode, derived by the last
    /// rebalance in send-all mode.
    pub fn required_amount(&self) -> Amount {
        match self.mode {
            TargetMode::Manual => self.required.unwrap_or_default(),
            TargetMode::SendAll => self
                .resolution
                .as_ref()
                .map_or(Amount::ZERO, |r| r.amount),
        }
    }

    pub fn current_fee(&self) -> Amount {
        self.resolution.as_ref().map_or(Amount::ZERO, |r| r.fee)
    }

    pub fn current_change(&self) -> Amount {
        self.resolution.as_ref().map_or(Amount::ZERO, |r| r.change)
    }

    pub fn total_selected(&self) -> Amount {
        self.resolution.as_ref().map_or(Amount::ZERO, |r| r.total)
    }

    /// Sum of every candidate input.
    pub fn total_available(&self) -> Amount {
        self.inputs
            .iter()
            .fold(Amount::ZERO, |acc, i| acc.saturating_add(i.amount))
    }

    pub fn selected_inputs(&self) -> &[SpendableInput] {
        match &self.resolution {
            Some(r) => &r.selected,
            None => &[],
        }
    }

    pub fn outputs(&self) -> &[OutputRef] {
        match &self.resolution {
            Some(r) => &r.outputs,
            None => &[],
        }
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub fn inputs(&self) -> &[SpendableInput] {
        &self.inputs
    }

    pub fn entry(&self) -> &EntryMeta {
        &self.entry
    }

    pub fn change_address(&self) -> &str {
        &self.change_address
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    pub fn target_mode(&self) -> TargetMode {
        self.mode
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }
}
