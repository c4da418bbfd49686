//! Error types for Sluice core types and collaborators.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")] Empty,
    #[error("invalid digit: {0}")] InvalidDigit(char),
    #[error("more than {decimals} fractional digits")] TooPrecise { decimals: u32 },
    #[error("amount overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxidError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: {0} != 32")] InvalidLength(usize),
    #[error("invalid outpoint: {0}")] InvalidOutPoint(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("unsupported chain: {0}")] Unsupported(String),
    #[error("unknown fee tier: {0}")] UnknownFeeTier(String),
}

/// Failures reported by the input and fee-rate collaborators.
///
/// These are transient from the planner's point of view: the caller retries
/// or shows the failure, the planner itself never produces them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")] Unavailable(String),
    #[error("malformed provider data: {0}")] Malformed(String),
}
