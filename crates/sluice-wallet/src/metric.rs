//! Transaction weight and fee estimation.
//!
//! A [`FeeMetric`] maps a transaction shape (input count, output count) to
//! weight units. Fees are priced per virtual kilobyte:
//!
//! ```text
//! fee = floor(rate * weight / 4096)     // 1024 vbytes * 4 WU per vbyte
//! ```
//!
//! All arithmetic is integer. The inverse, [`FeeMetric::rate_for_fee`], returns
//! the smallest rate whose forward fee equals the given fee.

use sluice_core::amount::Amount;
use sluice_core::constants::{Chain, WEIGHT_PER_KVB};
use sluice_core::types::FeeRate;

/// Weight model of a transaction shape.
pub trait FeeMetric: Send + Sync {
    /// Weight in weight units of a transaction with `inputs` inputs and
    /// `outputs` outputs.
    fn weight(&self, inputs: usize, outputs: usize) -> u64;

    /// Fee for the shape at `rate`, rounded down to whole base units.
    fn fee(&self, inputs: usize, outputs: usize, rate: FeeRate) -> Amount {
        fee_for_weight(self.weight(inputs, outputs), rate)
    }

    /// Smallest rate at which the shape costs exactly `fee`.
    fn rate_for_fee(&self, inputs: usize, outputs: usize, fee: Amount) -> FeeRate {
        rate_for_weight(self.weight(inputs, outputs), fee)
    }
}

/// `floor(rate * weight / 4096)`.
pub fn fee_for_weight(weight: u64, rate: FeeRate) -> Amount {
    let priced = rate.per_kvb() as u128 * weight as u128;
    Amount(priced / WEIGHT_PER_KVB as u128)
}

/// `ceil(fee * 4096 / weight)`, zero for an empty shape.
///
/// Saturates at `u64::MAX` for fees no representable rate can produce.
pub fn rate_for_weight(weight: u64, fee: Amount) -> FeeRate {
    if weight == 0 {
        return FeeRate::ZERO;
    }
    let weight = weight as u128;
    let rate = fee
        .base()
        .checked_mul(WEIGHT_PER_KVB as u128)
        .map(|scaled| scaled.div_ceil(weight))
        .unwrap_or(u128::MAX);
    FeeRate(u64::try_from(rate).unwrap_or(u64::MAX))
}

/// Weight that grows linearly with the number of inputs and outputs.
///
/// `weight = base + inputs * input_weight + outputs * output_weight`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearMetric {
    /// Fixed per-transaction overhead.
    pub base_weight: u64,
    /// Weight of one input including its witness.
    pub input_weight: u64,
    /// Weight of one output.
    pub output_weight: u64,
}

impl LinearMetric {
    /// Default wallet estimate for Bitcoin entries.
    ///
    /// Inputs at 60 vbytes and outputs at 31 vbytes, with a 78 vbyte fixed
    /// allowance covering overhead and witness size variance. A 1-in 2-out
    /// spend weighs 800 WU and a 2-in 2-out spend 1040 WU.
    pub const WALLET: Self = Self {
        base_weight: 78 * 4,
        input_weight: 60 * 4,
        output_weight: 31 * 4,
    };

    /// Native segwit, P2WPKH inputs and outputs.
    ///
    /// Overhead: version 4 + locktime 4 + two 1-byte counts at 4 WU each,
    /// plus 2 WU for the segwit marker and flag. Input: 41 non-witness
    /// bytes plus a 108 WU witness (signature and compressed key).
    /// Output: 31 bytes.
    pub const SEGWIT: Self = Self {
        base_weight: 42,
        input_weight: 41 * 4 + 108,
        output_weight: 31 * 4,
    };

    /// Legacy P2PKH inputs and outputs: 148-byte inputs, 34-byte outputs.
    pub const LEGACY: Self = Self {
        base_weight: 10 * 4,
        input_weight: 148 * 4,
        output_weight: 34 * 4,
    };

    pub const fn new(base_weight: u64, input_weight: u64, output_weight: u64) -> Self {
        Self {
            base_weight,
            input_weight,
            output_weight,
        }
    }

    /// Default metric for a chain's wallets.
    pub fn for_chain(chain: Chain) -> Self {
        match chain {
            Chain::Bitcoin | Chain::BitcoinTestnet => Self::WALLET,
            // Account plans price by gas and never consult the metric.
            Chain::Ethereum | Chain::EthereumClassic | Chain::Goerli => Self::WALLET,
        }
    }
}

impl FeeMetric for LinearMetric {
    fn weight(&self, inputs: usize, outputs: usize) -> u64 {
        self.base_weight
            .saturating_add(self.input_weight.saturating_mul(inputs as u64))
            .saturating_add(self.output_weight.saturating_mul(outputs as u64))
    }
}
