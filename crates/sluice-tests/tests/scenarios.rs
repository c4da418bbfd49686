//! End-to-end planning scenarios.
//!
//! Each test drives a full session through the public API: load inputs and
//! fee tiers from providers, set a target, balance, build the descriptor
//! and validate it before it would go to a signer.

use async_trait::async_trait;
use sluice_core::amount::Amount;
use sluice_core::constants::{Chain, SEQUENCE_REPLACEABLE};
use sluice_core::error::ProviderError;
use sluice_core::traits::{FeeRateProvider, InputProvider};
use sluice_core::types::{EntryId, EntryMeta, FeeRate, FeeTier, FeeTiers, SpendableInput};
use sluice_tests::helpers::*;
use sluice_wallet::{
    AccountBalancer, BalanceStatus, OutputRef, TargetMode, TransactionDescriptor,
    ValidationResult, open_session,
};

struct MemoryInputs(Vec<SpendableInput>);

#[async_trait]
impl InputProvider for MemoryInputs {
    async fn spendable_inputs(&self, _entry: &EntryId) -> Result<Vec<SpendableInput>, ProviderError> {
        Ok(self.0.clone())
    }
}

struct MemoryFees(FeeTiers);

#[async_trait]
impl FeeRateProvider for MemoryFees {
    async fn fee_rates(&self, _chain: Chain) -> Result<FeeTiers, ProviderError> {
        Ok(self.0)
    }
}

fn tiers() -> FeeTiers {
    FeeTiers {
        slow: FeeRate::from_per_vbyte(10),
        standard: FeeRate::from_per_vbyte(100),
        urgent: FeeRate::from_per_vbyte(150),
    }
}

fn three_inputs() -> Vec<SpendableInput> {
    vec![
        input(1, 0, btc("0.5"), "ADDR"),
        input(2, 0, btc("0.61"), "ADDR"),
        input(3, 0, btc("0.756"), "ADDR"),
    ]
}

// ---------------------------------------------------------------------------
// Reference scenarios
// ---------------------------------------------------------------------------

#[test]
fn two_of_three_inputs_with_change() {
    let mut b = test_balancer(three_inputs());
    b.set_destination("AAA")
        .set_fee_rate(FeeRate::from_per_vbyte(100))
        .set_required_amount(btc("0.97"));

    assert!(b.rebalance().unwrap());
    assert_eq!(b.selected_inputs().len(), 2);
    assert_eq!(b.outputs().len(), 2);
    assert_eq!(b.current_fee(), Amount(10_000));
    assert_eq!(
        b.current_change(),
        b.total_selected()
            .checked_sub(btc("0.97"))
            .and_then(|a| a.checked_sub(btc("0.0001")))
            .unwrap()
    );
    assert_eq!(b.validate(), ValidationResult::Ok);
}

#[test]
fn required_above_available() {
    let mut b = test_balancer(three_inputs());
    b.set_destination("addrTo").set_required_amount(btc("2"));

    assert!(!b.rebalance().unwrap());
    assert_eq!(b.selected_inputs().len(), 3);
    assert_eq!(b.current_change(), Amount::ZERO);
    assert_eq!(b.total_selected(), btc("1.866"));
    assert_eq!(b.validate(), ValidationResult::InsufficientFunds);
}

#[test]
fn single_input_send_and_change() {
    let mut b = test_balancer(vec![input(1, 0, Amount(112_233), "addr1")]);
    b.set_destination("addrTo")
        .set_required_amount(Amount(80_000))
        .set_fee_rate(FeeRate::from_per_vbyte(100));

    let descriptor = b.create().unwrap();
    let plan = descriptor.as_utxo().unwrap();
    assert_eq!(plan.fee, Amount(7_000));
    assert_eq!(
        plan.outputs,
        vec![
            OutputRef::send("addrTo", Amount(80_000)),
            OutputRef::change("addrChange", Amount(25_233), EntryId::new(ENTRY_ID)),
        ]
    );
    assert_eq!(plan.inputs[0].sequence, SEQUENCE_REPLACEABLE);
    assert_eq!(plan.inputs[0].entry_id, EntryId::new(ENTRY_ID));
}

#[test]
fn inputs_exactly_cover_required() {
    let mut b = test_balancer(vec![
        input(1, 0, Amount(1_000), "addr1"),
        input(2, 1, Amount(1_000), "addr2"),
    ]);
    b.set_destination("addrTo")
        .set_required_amount(Amount(2_000))
        .set_fee_rate(FeeRate(1024));

    let descriptor = b.create().unwrap();
    let plan = descriptor.as_utxo().unwrap();
    assert_eq!(plan.fee, Amount::ZERO);
    assert_eq!(plan.inputs.len(), 2);
    assert_eq!(plan.outputs.len(), 1);
    assert_eq!(b.validate(), ValidationResult::Ok);
}

#[test]
fn send_all_two_inputs() {
    let mut b = test_balancer(vec![
        input(1, 0, btc("0.05"), "addr1"),
        input(2, 0, btc("0.05"), "addr2"),
    ]);
    b.set_fee_rate(FeeRate::from_per_vbyte(100))
        .set_destination("addrTo")
        .set_target_mode(TargetMode::SendAll);

    assert!(b.rebalance().unwrap());
    assert_eq!(b.required_amount(), Amount(9_992_000));
    assert_eq!(b.outputs().len(), 1);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_to_signed_handoff() {
    let entry = EntryMeta::new(ENTRY_ID, Chain::Bitcoin);
    let mut b = open_session(
        entry,
        "addrChange",
        FeeTier::Standard,
        &MemoryInputs(three_inputs()),
        &MemoryFees(tiers()),
    )
    .await
    .unwrap()
    .with_metric(TEST_METRIC);

    assert_eq!(b.status(), BalanceStatus::Empty);
    b.set_destination("AAA").set_required_amount(btc("0.97"));
    assert_eq!(b.status(), BalanceStatus::Pending);

    let descriptor = b.create().unwrap();
    assert_eq!(b.validate(), ValidationResult::Ok);
    assert_eq!(descriptor.fee(), Amount(10_000));

    let json = serde_json::to_string(&descriptor).unwrap();
    let back: TransactionDescriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, descriptor);
}

#[tokio::test]
async fn tier_switch_reprices_plan() {
    let entry = EntryMeta::new(ENTRY_ID, Chain::Bitcoin);
    let mut b = open_session(
        entry,
        "addrChange",
        FeeTier::Slow,
        &MemoryInputs(vec![
            input(1, 0, btc("0.05"), "addr1"),
            input(2, 0, btc("0.05"), "addr2"),
        ]),
        &MemoryFees(tiers()),
    )
    .await
    .unwrap()
    .with_metric(TEST_METRIC);
    b.set_destination("addrTo").set_required_amount(btc("0.08"));

    b.rebalance().unwrap();
    assert_eq!(b.current_fee(), Amount(1_000));

    b.set_fee_rate(tiers().tier(FeeTier::Urgent));
    b.rebalance().unwrap();
    assert_eq!(b.current_fee(), btc("0.00015"));
    assert_eq!(b.estimate_rate(b.current_fee()).unwrap(), FeeRate::from_per_vbyte(150));
}

// ---------------------------------------------------------------------------
// Cancel flow
// ---------------------------------------------------------------------------

#[test]
fn cancel_returns_funds_in_one_output() {
    let mut b = test_balancer(vec![
        input(1, 0, Amount(1_000), "addr1"),
        input(2, 1, Amount(1_000), "addr2"),
    ]);
    b.set_destination("addrTo")
        .set_required_amount(Amount(1_000))
        .set_fee_rate(FeeRate::from_per_vbyte(1));
    let original = b.create().unwrap();

    b.set_destination("addrChange")
        .set_fee_rate(FeeRate::from_per_vbyte(2));
    let cancel = b.create().unwrap();
    let plan = cancel.as_utxo().unwrap();

    assert!(cancel.fee() > original.fee());
    assert_eq!(plan.outputs.len(), 1);
    assert_eq!(plan.outputs[0].address, "addrChange");
    assert!(plan.outputs.iter().all(|o| o.address != "addrTo"));
    assert_eq!(
        plan.total_out().unwrap().checked_add(plan.fee),
        plan.total_in()
    );
}

// ---------------------------------------------------------------------------
// Account chains
// ---------------------------------------------------------------------------

#[test]
fn account_send_all() {
    let eth = |s: &str| Amount::parse_decimal(s, Chain::Ethereum.unit()).unwrap();
    let mut p = AccountBalancer::new(EntryMeta::new("eth-1", Chain::Ethereum), "0xfrom", eth("0.5"))
        .unwrap();
    p.set_gas_price(Amount(30_000_000_000))
        .set_destination("0xto")
        .set_target_mode(TargetMode::SendAll);

    let descriptor = p.build().unwrap();
    let plan = descriptor.as_account().unwrap();
    assert_eq!(plan.fee, eth("0.00063"));
    assert_eq!(plan.amount, eth("0.49937"));
    assert_eq!(p.validate(), ValidationResult::Ok);
    assert!(descriptor.as_utxo().is_none());
}
