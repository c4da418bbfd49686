//! Shared test helpers for property and scenario tests.

use sluice_core::amount::{Amount, Unit};
use sluice_core::constants::Chain;
use sluice_core::types::{EntryMeta, OutPoint, SpendableInput, Txid};
use sluice_wallet::{Balancer, LinearMetric};

/// The simplified metric used by the reference scenarios: 120 WU per input,
/// 80 WU per output, no overhead.
pub const TEST_METRIC: LinearMetric = LinearMetric::new(0, 120, 80);

/// Entry id used by the reference scenarios.
pub const ENTRY_ID: &str = "f76416d7-3510-4d80-85df-52e7222e56df-1";

/// Whole-coin BTC amount from a decimal string.
pub fn btc(s: &str) -> Amount {
    Amount::parse_decimal(s, Unit::BTC).unwrap()
}

/// Deterministic txid from a seed byte.
pub fn txid(seed: u8) -> Txid {
    Txid([seed; 32])
}

/// Confirmed input `seed:vout` paying `address`.
pub fn input(seed: u8, vout: u32, amount: Amount, address: &str) -> SpendableInput {
    SpendableInput::new(OutPoint::new(txid(seed), vout), address, amount)
}

/// Inputs with distinct outpoints for each amount, in the given order.
pub fn inputs_from(amounts: &[u128]) -> Vec<SpendableInput> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, &amount)| {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&(i as u64).to_be_bytes());
            SpendableInput::new(
                OutPoint::new(Txid(bytes), i as u32),
                format!("addr{i}"),
                Amount(amount),
            )
        })
        .collect()
}

/// Bitcoin balancer over `inputs` with the test metric and change to
/// `addrChange`.
pub fn test_balancer(inputs: Vec<SpendableInput>) -> Balancer {
    Balancer::new(EntryMeta::new(ENTRY_ID, Chain::Bitcoin), "addrChange", inputs)
        .with_metric(TEST_METRIC)
}
