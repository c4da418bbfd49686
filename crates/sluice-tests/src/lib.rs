//! Property and scenario test suite for Sluice.
//!
//! Integration tests that drive the balancer through its public API and
//! check the planning invariants over generated input sets.

pub mod helpers;
