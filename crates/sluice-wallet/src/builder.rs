//! Transaction descriptors and the projection from a balanced plan.
//!
//! The descriptor is the hand-off artifact for the external signer:
//! 1. Balance the plan (`Balancer::rebalance`)
//! 2. Project it into a [`TransactionDescriptor`] (`Balancer::build`)
//! 3. Validate, then sign elsewhere
//!
//! Output order is a compatibility contract: the send output first, the
//! change output second.

use serde::{Deserialize, Serialize};
use sluice_core::amount::Amount;
use sluice_core::types::{EntryId, Txid};

use crate::balancer::{Balancer, Resolution};
use crate::error::PlanError;
use crate::validation;

/// A reference to one input of the planned transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputRef {
    pub txid: Txid,
    pub vout: u32,
    /// Address that owns the spent output (signing key lookup).
    pub address: String,
    pub amount: Amount,
    pub sequence: u32,
    /// Wallet entry that holds the signing key.
    pub entry_id: EntryId,
}

/// A planned output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub address: String,
    pub amount: Amount,
    /// Set on change outputs: the entry the change returns to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<EntryId>,
}

impl OutputRef {
    /// The user-specified destination output.
    pub fn send(address: impl Into<String>, amount: Amount) -> Self {
        Self {
            address: address.into(),
            amount,
            entry_id: None,
        }
    }

    /// Change routed back to the entry.
    pub fn change(address: impl Into<String>, amount: Amount, entry_id: EntryId) -> Self {
        Self {
            address: address.into(),
            amount,
            entry_id: Some(entry_id),
        }
    }

    pub fn is_change(&self) -> bool {
        self.entry_id.is_some()
    }
}

/// Planned transaction for a UTXO-model chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UtxoPlan {
    pub inputs: Vec<InputRef>,
    pub outputs: Vec<OutputRef>,
    pub fee: Amount,
}

impl UtxoPlan {
    /// Sum of the input amounts, `None` on overflow.
    pub fn total_in(&self) -> Option<Amount> {
        Amount::checked_sum(self.inputs.iter().map(|i| i.amount))
    }

    /// Sum of the output amounts, `None` on overflow.
    pub fn total_out(&self) -> Option<Amount> {
        Amount::checked_sum(self.outputs.iter().map(|o| o.amount))
    }
}

/// Planned transfer for an account-model chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountPlan {
    pub entry_id: EntryId,
    pub from: String,
    pub to: String,
    pub amount: Amount,
    pub gas_limit: u64,
    /// Price per unit of gas in base units.
    pub gas_price: Amount,
    /// `gas_limit * gas_price`.
    pub fee: Amount,
}

/// Final, immutable plan handed to the signer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionDescriptor {
    Utxo(UtxoPlan),
    Account(AccountPlan),
}

impl TransactionDescriptor {
    pub fn fee(&self) -> Amount {
        match self {
            Self::Utxo(plan) => plan.fee,
            Self::Account(plan) => plan.fee,
        }
    }

    pub fn as_utxo(&self) -> Option<&UtxoPlan> {
        match self {
            Self::Utxo(plan) => Some(plan),
            Self::Account(_) => None,
        }
    }

    pub fn as_account(&self) -> Option<&AccountPlan> {
        match self {
            Self::Account(plan) => Some(plan),
            Self::Utxo(_) => None,
        }
    }
}

/// Project a resolution into a UTXO plan, stamping every input with `sequence`.
pub fn build_utxo_plan(resolution: &Resolution, entry_id: &EntryId, sequence: u32) -> UtxoPlan {
    let inputs = resolution
        .selected
        .iter()
        .map(|input| InputRef {
            txid: input.outpoint.txid,
            vout: input.outpoint.vout,
            address: input.address.clone(),
            amount: input.amount,
            sequence,
            entry_id: entry_id.clone(),
        })
        .collect();

    UtxoPlan {
        inputs,
        outputs: resolution.outputs.clone(),
        fee: resolution.fee,
    }
}

impl Balancer {
    /// Build the descriptor from the last resolution.
    ///
    /// Pure: repeated calls on an unchanged balancer return equal
    /// descriptors. An insufficient plan still builds (for display and
    /// estimation); callers check [`Balancer::validate`] before signing.
    pub fn build(&self) -> Result<TransactionDescriptor, PlanError> {
        if !validation::has_destination(self.destination()) {
            return Err(PlanError::MissingDestination);
        }
        let resolution = self.resolution().ok_or(PlanError::NotBalanced)?;
        let plan = build_utxo_plan(resolution, &self.entry().id, self.config().sequence);
        Ok(TransactionDescriptor::Utxo(plan))
    }

    /// Rebalance, then build.
    pub fn create(&mut self) -> Result<TransactionDescriptor, PlanError> {
        self.rebalance()?;
        self.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::constants::{Chain, SEQUENCE_FINAL, SEQUENCE_REPLACEABLE};
    use sluice_core::types::{EntryMeta, FeeRate, OutPoint, SpendableInput};

    use crate::balancer::BalanceStatus;
    use crate::config::BalancerConfig;
    use crate::metric::LinearMetric;
    use crate::validation::ValidationResult;

    const ENTRY: &str = "f76416d7-3510-4d80-85df-52e7222e56df-1";

    fn input(seed: u8, vout: u32, amount: u128, address: &str) -> SpendableInput {
        SpendableInput::new(OutPoint::new(Txid([seed; 32]), vout), address, Amount(amount))
    }

    fn balancer(inputs: Vec<SpendableInput>) -> Balancer {
        Balancer::new(EntryMeta::new(ENTRY, Chain::Bitcoin), "addrChange", inputs)
            .with_metric(LinearMetric::new(0, 120, 80))
    }

    #[test]
    fn creates_unsigned_with_change() {
        let mut b = balancer(vec![input(1, 0, 112_233, "addr1")]);
        b.set_fee_rate(FeeRate::from_per_vbyte(100))
            .set_required_amount(Amount(80_000))
            .set_destination("addrTo");

        let descriptor = b.create().unwrap();
        let plan = descriptor.as_utxo().unwrap();

        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(
            plan.inputs[0],
            InputRef {
                txid: Txid([1; 32]),
                vout: 0,
                address: "addr1".into(),
                amount: Amount(112_233),
                sequence: SEQUENCE_REPLACEABLE,
                entry_id: EntryId::new(ENTRY),
            }
        );

        // (1 * 120 + 2 * 80) * 100 / 4
        assert_eq!(plan.fee, Amount(7_000));
        assert_eq!(plan.outputs.len(), 2);
        assert_eq!(plan.outputs[0], OutputRef::send("addrTo", Amount(80_000)));
        assert_eq!(
            plan.outputs[1],
            OutputRef::change("addrChange", Amount(112_233 - 80_000 - 7_000), EntryId::new(ENTRY))
        );
    }

    #[test]
    fn build_requires_destination() {
        let mut b = balancer(vec![input(1, 0, 10_000, "addr1")]);
        b.set_required_amount(Amount(1_000));
        b.rebalance().unwrap();
        assert_eq!(b.build(), Err(PlanError::MissingDestination));
    }

    #[test]
    fn blank_destination_is_missing() {
        let mut b = balancer(vec![input(1, 0, 10_000, "addr1")]);
        b.set_required_amount(Amount(1_000)).set_destination("   ");
        b.rebalance().unwrap();
        assert_eq!(b.status(), BalanceStatus::Empty);
        assert_eq!(b.build(), Err(PlanError::MissingDestination));
        assert_eq!(b.validate(), ValidationResult::NoDestination);
    }

    #[test]
    fn build_requires_rebalance() {
        let mut b = balancer(vec![input(1, 0, 10_000, "addr1")]);
        b.set_required_amount(Amount(1_000)).set_destination("addrTo");
        assert_eq!(b.build(), Err(PlanError::NotBalanced));
    }

    #[test]
    fn setter_invalidates_built_plan() {
        let mut b = balancer(vec![input(1, 0, 10_000, "addr1")]);
        b.set_required_amount(Amount(1_000)).set_destination("addrTo");
        b.create().unwrap();
        b.set_fee_rate(FeeRate::from_per_vbyte(2));
        assert_eq!(b.build(), Err(PlanError::NotBalanced));
    }

    #[test]
    fn build_is_deterministic() {
        let mut b = balancer(vec![
            input(1, 0, 50_000_000, "addr1"),
            input(2, 0, 61_000_000, "addr2"),
            input(3, 0, 75_600_000, "addr3"),
        ]);
        b.set_fee_rate(FeeRate::from_per_vbyte(100))
            .set_required_amount(Amount(97_000_000))
            .set_destination("AAA");
        b.rebalance().unwrap();

        let first = b.build().unwrap();
        let second = b.build().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn final_sequence_from_config() {
        let mut b = balancer(vec![input(1, 0, 10_000, "addr1")]).with_config(BalancerConfig {
            sequence: SEQUENCE_FINAL,
            ..BalancerConfig::default()
        });
        b.set_required_amount(Amount(1_000)).set_destination("addrTo");
        let descriptor = b.create().unwrap();
        let plan = descriptor.as_utxo().unwrap();
        assert!(plan.inputs.iter().all(|i| i.sequence == SEQUENCE_FINAL));
    }

    #[test]
    fn insufficient_plan_still_builds() {
        let mut b = balancer(vec![input(1, 0, 1_000, "addr1")]);
        b.set_required_amount(Amount(5_000)).set_destination("addrTo");
        let descriptor = b.create().unwrap();
        let plan = descriptor.as_utxo().unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.fee, Amount::ZERO);
        assert_eq!(plan.outputs, vec![OutputRef::send("addrTo", Amount(5_000))]);
    }

    #[test]
    fn totals() {
        let mut b = balancer(vec![input(1, 0, 112_233, "addr1")]);
        b.set_fee_rate(FeeRate::from_per_vbyte(100))
            .set_required_amount(Amount(80_000))
            .set_destination("addrTo");
        let descriptor = b.create().unwrap();
        let plan = descriptor.as_utxo().unwrap();
        assert_eq!(plan.total_in(), Some(Amount(112_233)));
        assert_eq!(
            plan.total_out().unwrap().checked_add(plan.fee),
            plan.total_in()
        );
        assert_eq!(descriptor.fee(), Amount(7_000));
        assert!(descriptor.as_account().is_none());
    }

    #[test]
    fn descriptor_json_shape() {
        let mut b = balancer(vec![input(1, 0, 112_233, "addr1")]);
        b.set_fee_rate(FeeRate::from_per_vbyte(100))
            .set_required_amount(Amount(80_000))
            .set_destination("addrTo");
        let descriptor = b.create().unwrap();

        let json = serde_json::to_string(&descriptor).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["utxo"]["fee"], 7_000);
        assert_eq!(value["utxo"]["inputs"][0]["sequence"], 4_294_967_280u64);
        assert!(value["utxo"]["outputs"][0].get("entry_id").is_none());
        assert_eq!(value["utxo"]["outputs"][1]["entry_id"], ENTRY);

        let back: TransactionDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }
}
