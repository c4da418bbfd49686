//! Planning input types: outpoints, spendable inputs, wallet entries, fee rates.
//!
//! All monetary values are [`Amount`]s of base units. Fee rates are prices per
//! virtual kilobyte (1024 vbytes).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::amount::Amount;
use crate::constants::{Chain, VBYTES_PER_KVB};
use crate::error::{ChainError, TxidError};

/// A 32-byte transaction identifier, rendered as lowercase hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Txid {
    type Err = TxidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| TxidError::InvalidHex(e.to_string()))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TxidError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl Serialize for Txid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reference to a specific output of a previous transaction.
///
/// Orders by txid, then output index. The balancer relies on this ordering to
/// break ties between equal-valued inputs.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    pub txid: Txid,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for OutPoint {
    type Err = TxidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .rsplit_once(':')
            .ok_or_else(|| TxidError::InvalidOutPoint(s.to_string()))?;
        let vout = vout
            .parse()
            .map_err(|_| TxidError::InvalidOutPoint(s.to_string()))?;
        Ok(Self {
            txid: txid.parse()?,
            vout,
        })
    }
}

/// One candidate source of funds, as reported by the input provider.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SpendableInput {
    /// The output being spent.
    #[serde(flatten)]
    pub outpoint: OutPoint,
    /// Address that owns the output.
    pub address: String,
    /// Value of the output in base units.
    pub amount: Amount,
    /// Whether the output is confirmed on chain.
    #[serde(default)]
    pub confirmed: bool,
}

impl SpendableInput {
    /// A confirmed input.
    pub fn new(outpoint: OutPoint, address: impl Into<String>, amount: Amount) -> Self {
        Self {
            outpoint,
            address: address.into(),
            amount,
            confirmed: true,
        }
    }
}

/// Identifier of the wallet entry that owns the inputs and the change.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata of the wallet entry a plan is composed for.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    /// Entry identifier, carried on input references and change outputs.
    pub id: EntryId,
    /// Chain the entry holds funds on.
    pub chain: Chain,
}

impl EntryMeta {
    pub fn new(id: impl Into<String>, chain: Chain) -> Self {
        Self {
            id: EntryId::new(id),
            chain,
        }
    }
}

/// Price in base units per virtual kilobyte (1024 vbytes).
///
/// # Examples
///
/// ```
/// use sluice_core::types::FeeRate;
/// assert_eq!(FeeRate::from_per_vbyte(100), FeeRate(102_400));
/// ```
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct FeeRate(pub u64);

impl FeeRate {
    pub const ZERO: Self = Self(0);

    /// Rate from a whole price per virtual byte.
    pub fn from_per_vbyte(per_vbyte: u64) -> Self {
        Self(per_vbyte.saturating_mul(VBYTES_PER_KVB))
    }

    pub fn per_kvb(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/kvB", self.0)
    }
}

/// Confidence tier of a network fee estimate.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeeTier {
    Slow,
    #[default]
    Standard,
    Urgent,
}

impl FromStr for FeeTier {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" | "low" => Ok(Self::Slow),
            "standard" | "std" => Ok(Self::Standard),
            "urgent" | "high" => Ok(Self::Urgent),
            other => Err(ChainError::UnknownFeeTier(other.to_string())),
        }
    }
}

/// Network fee estimates at three confidence tiers.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FeeTiers {
    /// Cheapest rate, for spends that can wait several blocks.
    pub slow: FeeRate,
    /// Typical rate for confirmation within a few blocks.
    pub standard: FeeRate,
    /// Rate for next-block confirmation.
    pub urgent: FeeRate,
}

impl FeeTiers {
    pub fn tier(&self, tier: FeeTier) -> FeeRate {
        match tier {
            FeeTier::Slow => self.slow,
            FeeTier::Standard => self.standard,
            FeeTier::Urgent => self.urgent,
        }
    }
}
