//! Client for a chain node child process
//!
//! Owns the node's stdin/stdout pipes and performs strictly sequential
//! request/response exchanges. Events that arrive while waiting for a
//! response are consumed in place.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::common::{Error, Result};

use super::codec;
use super::types::*;

/// Client for communicating with a running node
pub struct NodeClient {
    /// Node subprocess
    process: Child,
    /// Buffered reader for node stdout
    reader: BufReader<ChildStdout>,
    /// Buffered writer for node stdin
    writer: BufWriter<ChildStdin>,
    /// Sequence number for requests
    seq: AtomicI64,
    /// Timeout applied to every request
    request_timeout: Duration,
    /// Head block as last reported by a `block` event
    head_block: u64,
}

impl NodeClient {
    /// Spawn a node process and create a client
    ///
    /// `stderr` receives the node's log output.
    pub async fn spawn(
        node_path: &Path,
        args: &[String],
        stderr: Stdio,
        request_timeout: Duration,
    ) -> Result<Self> {
        let mut cmd = Command::new(node_path);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .kill_on_drop(true);

        let mut process = cmd.spawn().map_err(|e| {
            Error::NodeStartFailed(format!("Failed to start {}: {}", node_path.display(), e))
        })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::NodeStartFailed("Failed to get node stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::NodeStartFailed("Failed to get node stdout".to_string()))?;

        tracing::debug!(pid = ?process.id(), node = %node_path.display(), "Spawned node process");

        Ok(Self {
            process,
            reader: BufReader::new(stdout),
            writer: BufWriter::new(stdin),
            seq: AtomicI64::new(1),
            request_timeout,
            head_block: 0,
        })
    }

    /// Get the next sequence number
    fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and return its sequence number
    async fn send_request(&mut self, command: &str, arguments: Option<Value>) -> Result<i64> {
        let seq = self.next_seq();

        let request = RequestMessage {
            seq,
            message_type: "request".to_string(),
            command: command.to_string(),
            arguments,
        };

        let json = serde_json::to_string(&request)?;
        tracing::debug!(target: "chain_harness::wire", ">>> {}", json);

        codec::write_message(&mut self.writer, &json).await?;

        Ok(seq)
    }

    /// Read the next message from the node
    async fn read_message(&mut self) -> Result<Value> {
        let json = codec::read_message(&mut self.reader).await?;
        tracing::debug!(target: "chain_harness::wire", "<<< {}", json);
        serde_json::from_str(&json).map_err(|e| Error::NodeProtocol(format!("Invalid JSON: {}", e)))
    }

    /// Handle an unsolicited event
    fn handle_event(&mut self, event: EventMessage) {
        match event.event.as_str() {
            "block" => {
                let body = event.body.unwrap_or(Value::Null);
                match serde_json::from_value::<BlockEventBody>(body) {
                    Ok(block) => {
                        tracing::trace!(block_num = block.block_num, txs = block.transactions, "Block produced");
                        self.head_block = self.head_block.max(block.block_num);
                    }
                    Err(e) => tracing::warn!("Malformed block event: {}", e),
                }
            }
            other => tracing::debug!("Ignoring node event '{}'", other),
        }
    }

    /// Send a request and wait for its response
    async fn exchange(&mut self, command: &str, arguments: Option<Value>) -> Result<Value> {
        let seq = self.send_request(command, arguments).await?;

        loop {
            let msg = self.read_message().await?;

            let msg_type = msg
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");

            match msg_type {
                "response" => {
                    let response: ResponseMessage = serde_json::from_value(msg)?;

                    if response.request_seq != seq {
                        // Requests are never pipelined, so this is a stale reply
                        tracing::warn!(
                            expected = seq,
                            got = response.request_seq,
                            "Discarding response to an earlier request"
                        );
                        continue;
                    }

                    if response.success {
                        return Ok(response.body.unwrap_or(Value::Null));
                    }
                    return Err(Error::node_request_failed(
                        command,
                        &response.message.unwrap_or_else(|| "Unknown error".to_string()),
                    ));
                }
                "event" => {
                    let event: EventMessage = serde_json::from_value(msg)?;
                    self.handle_event(event);
                }
                _ => {
                    tracing::warn!("Unknown message type: {}", msg_type);
                }
            }
        }
    }

    /// Send a request and wait for the typed response, bounded by the request timeout
    pub async fn request<A: Serialize, T: DeserializeOwned>(
        &mut self,
        command: &str,
        arguments: Option<&A>,
    ) -> Result<T> {
        let arguments = arguments.map(serde_json::to_value).transpose()?;
        let timeout = self.request_timeout;

        let body = tokio::time::timeout(timeout, self.exchange(command, arguments))
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))??;

        serde_json::from_value(body).map_err(|e| {
            Error::NodeProtocol(format!("Failed to parse {} response: {}", command, e))
        })
    }

    /// Query chain info; doubles as the health check
    pub async fn info(&mut self) -> Result<InfoResponse> {
        self.request::<Value, _>("info", None).await
    }

    /// Submit a signed transaction, returning its id
    pub async fn push_transaction(&mut self, args: &PushTransactionArguments) -> Result<String> {
        let response: PushTransactionResponse =
            self.request("push_transaction", Some(args)).await?;
        Ok(response.transaction_id)
    }

    /// Query the inclusion state of a submitted transaction
    pub async fn transaction_status(&mut self, id: &str) -> Result<TransactionStatus> {
        let args = TransactionStatusArguments { id: id.to_string() };
        self.request("get_transaction_status", Some(&args)).await
    }

    /// Fetch an account's permissions and code hash
    pub async fn get_account(&mut self, args: &AccountArguments) -> Result<AccountInfo> {
        self.request("get_account", Some(args)).await
    }

    /// Fetch the ABI deployed on an account
    pub async fn get_abi(&mut self, args: &AccountArguments) -> Result<AbiResponse> {
        self.request("get_abi", Some(args)).await
    }

    /// Read rows of a contract table
    pub async fn get_table_rows(&mut self, args: &TableRowsArguments) -> Result<TableRows> {
        self.request("get_table_rows", Some(args)).await
    }

    /// Read the balances an account holds on a token contract
    pub async fn get_currency_balance(
        &mut self,
        args: &CurrencyBalanceArguments,
    ) -> Result<Vec<String>> {
        self.request("get_currency_balance", Some(args)).await
    }

    /// Read the supply row of a token symbol
    pub async fn get_currency_stats(
        &mut self,
        args: &CurrencyStatsArguments,
    ) -> Result<Option<CurrencyStats>> {
        self.request("get_currency_stats", Some(args)).await
    }

    /// Head block as last observed through events
    pub fn head_block(&self) -> u64 {
        self.head_block
    }

    /// Ask the node to exit, then force kill if it lingers
    pub async fn terminate(&mut self) -> Result<()> {
        // Don't wait for a response - the node may exit before replying
        let _ = self.send_request("shutdown", None).await;

        let grace = Duration::from_millis(500);
        if tokio::time::timeout(grace, self.process.wait()).await.is_ok() {
            return Ok(());
        }

        #[cfg(unix)]
        if let Some(pid) = self.process.id() {
            tracing::debug!(pid, "Node ignored shutdown request, sending SIGTERM");
            // SAFETY: pid belongs to our unreaped child
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
            if tokio::time::timeout(grace, self.process.wait()).await.is_ok() {
                return Ok(());
            }
        }

        tracing::debug!("Node still running, killing");
        let _ = self.process.kill().await;
        Ok(())
    }

    /// Check if the node is still running
    pub fn is_running(&mut self) -> bool {
        self.process.try_wait().ok().flatten().is_none()
    }

    /// OS process id, if the process has not been reaped
    pub fn pid(&self) -> Option<u32> {
        self.process.id()
    }
}

impl Drop for NodeClient {
    fn drop(&mut self) {
        // Best-effort since we can't await in drop
        let _ = self.process.start_kill();
    }
}
