//! Node protocol message types
//!
//! Requests carry a `command` and optional `arguments`; responses echo the
//! request's `seq` in `request_seq`. Events are unsolicited notifications
//! (currently only `block`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::{Asset, Name, Permission, SignedTransaction};

// === Base Protocol Messages ===

/// Node request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMessage {
    pub seq: i64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Node response message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub seq: i64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Node event message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub seq: i64,
    #[serde(rename = "type")]
    pub message_type: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Body of a `block` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEventBody {
    pub block_num: u64,
    pub transactions: usize,
}

// === Requests and Responses ===

/// Response body of `info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub chain_id: String,
    pub server_version: String,
    pub head_block_num: u64,
}

/// Arguments of `push_transaction`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTransactionArguments {
    pub transaction: SignedTransaction,
}

/// Response body of `push_transaction`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTransactionResponse {
    pub transaction_id: String,
}

/// Arguments of `get_transaction_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusArguments {
    pub id: String,
}

/// Lifecycle of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    Pending,
    Executed,
    Failed,
    Unknown,
}

/// Response body of `get_transaction_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub id: String,
    pub state: TransactionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_num: Option<u64>,
    /// Global sequence of the first action, assigned at inclusion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_sequence: Option<u64>,
    /// Node diagnostic for failed transactions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Contract console output, one entry per line
    #[serde(default)]
    pub console: Vec<String>,
}

/// Arguments naming a single account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountArguments {
    pub account: Name,
}

/// Response body of `get_account`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_name: Name,
    pub created_block: u64,
    pub permissions: Vec<Permission>,
    /// Hex SHA-256 of the deployed code, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_hash: Option<String>,
}

/// Response body of `get_abi`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiResponse {
    pub account_name: Name,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<Value>,
}

/// Arguments of `get_table_rows`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRowsArguments {
    pub code: Name,
    pub scope: String,
    pub table: Name,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// First primary key to return, inclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<String>,
}

fn default_limit() -> usize {
    100
}

/// Response body of `get_table_rows`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRows {
    pub rows: Vec<Value>,
    pub more: bool,
    /// Primary key of the first row after this page, set when `more` is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_key: Option<String>,
}

/// Arguments of `get_currency_balance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyBalanceArguments {
    pub code: Name,
    pub account: Name,
    pub symbol: String,
}

/// Arguments of `get_currency_stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyStatsArguments {
    pub code: Name,
    pub symbol: String,
}

/// Supply row of a token symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyStats {
    pub supply: Asset,
    pub max_supply: Asset,
    pub issuer: Name,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_status_wire_form() {
        let status: TransactionStatus = serde_json::from_value(serde_json::json!({
            "id": "ab12",
            "state": "failed",
            "error": "assertion failure with message: overdrawn balance"
        }))
        .unwrap();
        assert_eq!(status.state, TransactionState::Failed);
        assert!(status.console.is_empty());
        assert!(status.block_num.is_none());
    }

    #[test]
    fn test_table_rows_limit_defaults() {
        let args: TableRowsArguments = serde_json::from_value(serde_json::json!({
            "code": "amax.token",
            "scope": "ENTU",
            "table": "stat"
        }))
        .unwrap();
        assert_eq!(args.limit, 100);
        assert_eq!(args.lower_bound, None);
    }
}
