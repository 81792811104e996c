//! Error types for the chain harness
//!
//! Setup failures (node, build, deploy) are fatal to a scenario. Node-side
//! rejections of a transaction are surfaced as [`Error::Transaction`] so a
//! scenario can assert on them as ordinary values.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the chain harness
#[derive(Error, Debug)]
pub enum Error {
    // === Node Errors ===
    #[error("Chain node is not running. Call reset() or start() first")]
    NodeNotRunning,

    #[error("Chain node failed to start: {0}")]
    NodeStartFailed(String),

    #[error("Chain node reset failed: {0}")]
    NodeReset(String),

    #[error("Chain node '{name}' not found. Searched: {searched}")]
    NodeNotFound { name: String, searched: String },

    #[error("Chain node exited unexpectedly")]
    NodeCrashed,

    #[error("Node protocol error: {0}")]
    NodeProtocol(String),

    #[error("Node request '{command}' failed: {message}")]
    NodeRequestFailed { command: String, message: String },

    // === Account Errors ===
    #[error("Account '{0}' is already registered")]
    DuplicateAccount(String),

    #[error("Account '{0}' is not registered")]
    UnknownAccount(String),

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // === Contract Errors ===
    #[error("Failed to build contract at '{path}': {reason}")]
    Build { path: String, reason: String },

    #[error("Failed to deploy contract to '{account}': {reason}")]
    Deploy { account: String, reason: String },

    #[error("Invalid ABI: {0}")]
    InvalidAbi(String),

    #[error("Contract '{contract}' has no action '{action}'")]
    UnknownAction { contract: String, action: String },

    // === Transaction Errors ===
    #[error("Transaction '{action}' rejected: {message}")]
    Transaction { action: String, message: String },

    #[error("Invalid asset '{input}': {reason}")]
    InvalidAsset { input: String, reason: String },

    #[error("Invalid symbol '{input}': {reason}")]
    InvalidSymbol { input: String, reason: String },

    // === Timeout Errors ===
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Transaction {id} not included after {secs} seconds")]
    InclusionTimeout { id: String, secs: u64 },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a node not found error with search paths
    pub fn node_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::NodeNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a node request failed error
    pub fn node_request_failed(command: &str, message: &str) -> Self {
        Self::NodeRequestFailed {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a transaction rejection carrying the node's diagnostic
    pub fn transaction(action: &str, message: &str) -> Self {
        Self::Transaction {
            action: action.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a build error for a source path
    pub fn build(path: &Path, reason: impl Into<String>) -> Self {
        Self::Build {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Create a deploy error for a target account
    pub fn deploy(account: &str, reason: impl Into<String>) -> Self {
        Self::Deploy {
            account: account.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid name error
    pub fn invalid_name(name: &str, reason: &str) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid asset error
    pub fn invalid_asset(input: &str, reason: &str) -> Self {
        Self::InvalidAsset {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid symbol error
    pub fn invalid_symbol(input: &str, reason: &str) -> Self {
        Self::InvalidSymbol {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the node rejected a transaction (as opposed to a harness failure)
    ///
    /// Negative scenarios match on this to treat a rejection as the expected
    /// outcome while still failing on setup or transport errors.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Transaction { .. })
    }

    /// Whether a scenario step may list this error as its expected outcome
    ///
    /// Covers node rejections plus refusals of the requested operation itself.
    /// Node, transport, and timeout failures are never expectable.
    pub fn is_expectable(&self) -> bool {
        self.is_rejection()
            || matches!(
                self,
                Self::Deploy { .. }
                    | Self::DuplicateAccount(_)
                    | Self::Build { .. }
                    | Self::UnknownAction { .. }
            )
    }

    /// The node's diagnostic message for a rejected transaction
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            Self::Transaction { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_is_distinguished_from_setup_errors() {
        let rejected = Error::transaction("amax.token::issue", "symbol precision mismatch");
        assert!(rejected.is_rejection());
        assert_eq!(rejected.rejection_message(), Some("symbol precision mismatch"));

        let fatal = Error::NodeReset("data dir locked".to_string());
        assert!(!fatal.is_rejection());
        assert_eq!(fatal.rejection_message(), None);
    }

    #[test]
    fn test_only_refusals_are_expectable() {
        assert!(Error::transaction("amax.token::transfer", "overdrawn balance").is_expectable());
        assert!(Error::DuplicateAccount("admin".to_string()).is_expectable());
        assert!(Error::Deploy {
            account: "locked".to_string(),
            reason: "missing authority".to_string(),
        }
        .is_expectable());

        assert!(!Error::NodeNotRunning.is_expectable());
        assert!(!Error::NodeCrashed.is_expectable());
        assert!(!Error::Timeout(5).is_expectable());
        assert!(!Error::NodeProtocol("bad frame".to_string()).is_expectable());
    }

    #[test]
    fn test_node_not_found_lists_search_paths() {
        let err = Error::node_not_found("nodeos", &["/usr/bin", "/opt/bin"]);
        assert_eq!(
            err.to_string(),
            "Chain node 'nodeos' not found. Searched: /usr/bin, /opt/bin"
        );
    }
}
