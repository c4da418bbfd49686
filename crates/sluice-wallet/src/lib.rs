//! # sluice-wallet: coin selection and transaction planning.
//!
//! Turns a set of spendable inputs and a desired spend into a fee-correct,
//! deterministic transaction plan. Signing and broadcasting happen
//! elsewhere; the [`TransactionDescriptor`] is the hand-off.
//!
//! # Modules
//!
//! - [`error`]: `PlanError` enum
//! - [`config`]: Per-chain balancer tunables
//! - [`metric`]: Weight and fee estimation per transaction shape
//! - [`balancer`]: Largest-first selection with change/no-change balancing
//! - [`builder`]: Transaction descriptors
//! - [`validation`]: Pre-signing plan checks
//! - [`account`]: Single-balance transfers for account-model chains
//! - [`session`]: Loading a balancer from the input and fee providers

pub mod account;
pub mod balancer;
pub mod builder;
pub mod config;
pub mod error;
pub mod metric;
pub mod session;
pub mod validation;

// Re-exports for convenient access
pub use account::{AccountBalancer, DEFAULT_GAS_LIMIT};
pub use balancer::{BalanceStatus, Balancer, PlanParams, Resolution, TargetMode, resolve};
pub use builder::{AccountPlan, InputRef, OutputRef, TransactionDescriptor, UtxoPlan};
pub use config::BalancerConfig;
pub use error::PlanError;
pub use metric::{FeeMetric, LinearMetric};
pub use session::open_session;
pub use validation::{PlanSnapshot, ValidationResult, validate};
