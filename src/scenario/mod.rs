//! Scenario control
//!
//! [`Scenario`] is the explicit per-test context used from Rust tests; the
//! YAML runner drives the same context from scenario files.

mod config;
mod context;
mod runner;

pub use config::*;
pub use context::{AccountScope, Scenario};
pub use runner::{load_scenario, run_scenario, TestResult};
