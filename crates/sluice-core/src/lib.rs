//! # sluice-core
//! Foundation types and collaborator traits for Sluice transaction planning.

pub mod amount;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use amount::{Amount, Unit};
pub use constants::{Chain, ChainModel};
pub use error::{AmountError, ChainError, ProviderError, TxidError};
pub use traits::{FeeRateProvider, InputProvider};
pub use types::{EntryId, EntryMeta, FeeRate, FeeTier, FeeTiers, OutPoint, SpendableInput, Txid};
