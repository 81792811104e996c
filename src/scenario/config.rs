//! YAML scenario file format
//!
//! A scenario is a list of steps tagged by `action`. String parameters may
//! reference earlier results through `${alias}`, where aliases are assigned
//! with `as:`.

use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct ScenarioFile {
    /// Name of the scenario
    pub name: String,
    /// Printed as the scenario banner
    pub description: Option<String>,
    /// Node log path, relative to the scenario file
    pub log: Option<PathBuf>,
    /// Steps, run in order
    pub steps: Vec<Step>,
}

/// A single scenario step
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Create a root account
    NewMasterAccount {
        #[serde(rename = "as")]
        alias: Option<String>,
        expect: Option<Expectation>,
    },
    /// Create a child account; a generated name is used when `name` is absent
    NewAccount {
        parent: String,
        name: Option<String>,
        #[serde(rename = "as")]
        alias: Option<String>,
        expect: Option<Expectation>,
    },
    /// Install or replace a permission
    UpdateAuth {
        account: String,
        permission: String,
        parent: Option<String>,
        #[serde(default = "default_threshold")]
        threshold: u32,
        #[serde(default)]
        keys: Vec<KeySpec>,
        #[serde(default)]
        accounts: Vec<DelegateSpec>,
        expect: Option<Expectation>,
    },
    /// Build a contract source, relative to the scenario file
    Build {
        source: PathBuf,
        #[serde(rename = "as")]
        alias: Option<String>,
        expect: Option<Expectation>,
    },
    /// Deploy an earlier build to an account
    Deploy {
        build: String,
        account: String,
        #[serde(rename = "as")]
        alias: Option<String>,
        expect: Option<Expectation>,
    },
    /// Deploy the configured token contract on its own account
    SetupToken {
        account: Option<String>,
        #[serde(rename = "as")]
        alias: Option<String>,
        expect: Option<Expectation>,
    },
    /// Deploy the configured burn-pool contract on its own account
    SetupBurnpool {
        account: Option<String>,
        #[serde(rename = "as")]
        alias: Option<String>,
        expect: Option<Expectation>,
    },
    /// Call a contract action
    PushAction {
        contract: String,
        name: String,
        #[serde(default)]
        data: Value,
        /// `account@permission` entries, in order
        authorization: Vec<String>,
        expect: Option<Expectation>,
    },
    /// Token transfer routed by symbol
    Transfer {
        from: String,
        to: String,
        quantity: String,
        #[serde(default)]
        memo: String,
        expect: Option<Expectation>,
    },
    /// Compare a balance read from the node
    AssertBalance {
        account: String,
        /// Symbol code, e.g. `MUSDT`
        symbol: String,
        equals: String,
        /// Token contract; the symbol's route is used when absent
        contract: Option<String>,
    },
    /// Check rows of a contract table
    AssertTable {
        code: String,
        scope: String,
        table: String,
        /// Exact row count
        rows: Option<usize>,
        /// A row whose fields include all of these
        contains: Option<Value>,
    },
    /// Wait for a node log line
    CheckLog {
        contains: String,
        #[serde(default = "default_log_timeout")]
        timeout_ms: u64,
    },
    /// Print a comment marker
    Comment { text: String },
    /// Pause
    Sleep { ms: u64 },
}

fn default_threshold() -> u32 {
    1
}

fn default_log_timeout() -> u64 {
    5000
}

/// Expected outcome of a step
#[derive(Deserialize, Debug)]
pub struct Expectation {
    /// Whether the step should succeed
    pub success: Option<bool>,
    /// Substring of the expected error; implies `success: false`
    pub error_contains: Option<String>,
}

impl Expectation {
    pub fn expects_failure(&self) -> bool {
        self.error_contains.is_some() || self.success == Some(false)
    }
}

/// A key inside an authority: an account alias or name (its key), or a
/// literal public key
#[derive(Deserialize, Debug)]
pub struct KeySpec {
    pub key: String,
    #[serde(default = "default_weight")]
    pub weight: u16,
}

/// A delegated `account@permission` inside an authority
#[derive(Deserialize, Debug)]
pub struct DelegateSpec {
    pub permission: String,
    #[serde(default = "default_weight")]
    pub weight: u16,
}

fn default_weight() -> u16 {
    1
}
