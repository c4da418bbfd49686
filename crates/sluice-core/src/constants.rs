//! Planning constants and supported chains. Amounts are in base units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::amount::Unit;
use crate::error::ChainError;

/// Weight units per virtual byte.
pub const WITNESS_SCALE_FACTOR: u64 = 4;

/// Virtual bytes per virtual kilobyte, the denomination fee rates are quoted in.
pub const VBYTES_PER_KVB: u64 = 1024;

/// Weight units per virtual kilobyte.
pub const WEIGHT_PER_KVB: u64 = VBYTES_PER_KVB * WITNESS_SCALE_FACTOR;

/// Input sequence that signals replaceability (below `0xFFFF_FFFE`).
pub const SEQUENCE_REPLACEABLE: u32 = 0xFFFF_FFF0;

/// Input sequence for final, non-replaceable inputs.
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// Smallest change worth creating for a P2WPKH output, in satoshis.
pub const SEGWIT_DUST_THRESHOLD: u128 = 294;

/// How a chain accounts for funds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChainModel {
    /// Discrete unspent outputs that are consumed whole.
    Utxo,
    /// A single balance per address.
    Account,
}

/// Chains the planner knows how to price.
///
/// # Examples
///
/// ```
/// use sluice_core::constants::{Chain, ChainModel};
/// let chain: Chain = "btc".parse().unwrap();
/// assert_eq!(chain, Chain::Bitcoin);
/// assert_eq!(chain.model(), ChainModel::Utxo);
/// assert_eq!(Chain::Ethereum.to_string(), "eth");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chain {
    #[default]
    #[serde(rename = "btc")]
    Bitcoin,
    #[serde(rename = "testbtc")]
    BitcoinTestnet,
    #[serde(rename = "eth")]
    Ethereum,
    #[serde(rename = "etc")]
    EthereumClassic,
    #[serde(rename = "goerli")]
    Goerli,
}

impl Chain {
    /// Short lowercase code used in config and file formats.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Bitcoin => "btc",
            Self::BitcoinTestnet => "testbtc",
            Self::Ethereum => "eth",
            Self::EthereumClassic => "etc",
            Self::Goerli => "goerli",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Self::Bitcoin => Unit::BTC,
            Self::BitcoinTestnet => Unit::TEST_BTC,
            Self::Ethereum | Self::Goerli => Unit::ETH,
            Self::EthereumClassic => Unit::ETC,
        }
    }

    pub fn model(&self) -> ChainModel {
        match self {
            Self::Bitcoin | Self::BitcoinTestnet => ChainModel::Utxo,
            Self::Ethereum | Self::EthereumClassic | Self::Goerli => ChainModel::Account,
        }
    }

    /// Sequence number stamped on every input planned for this chain.
    pub fn default_sequence(&self) -> u32 {
        match self.model() {
            ChainModel::Utxo => SEQUENCE_REPLACEABLE,
            ChainModel::Account => SEQUENCE_FINAL,
        }
    }

    /// Minimum change output, in base units. Zero for account chains.
    pub fn dust_threshold(&self) -> u128 {
        match self.model() {
            ChainModel::Utxo => SEGWIT_DUST_THRESHOLD,
            ChainModel::Account => 0,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Chain {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "btc" | "bitcoin" => Ok(Self::Bitcoin),
            "testbtc" | "testnet" => Ok(Self::BitcoinTestnet),
            "eth" | "ethereum" => Ok(Self::Ethereum),
            "etc" => Ok(Self::EthereumClassic),
            "goerli" => Ok(Self::Goerli),
            other => Err(ChainError::Unsupported(other.to_string())),
        }
    }
}
