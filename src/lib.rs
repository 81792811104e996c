//! Chain Harness - end-to-end test harness for contract scenarios
//!
//! This library drives a local chain node as a managed child process,
//! keeps an account registry with an authority graph, builds and deploys
//! contracts, executes transactions, and inspects resulting state.
//! Scenarios are written either in Rust against [`scenario::Scenario`] or
//! as YAML files run by [`scenario::run_scenario`].

pub mod accounts;
pub mod chain;
pub mod cli;
pub mod commands;
pub mod common;
pub mod contract;
pub mod inspect;
pub mod node;
pub mod scenario;
pub mod tx;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use scenario::Scenario;
