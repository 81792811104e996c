//! Node lifecycle: start, reset to genesis, stop
//!
//! The supervisor is the only owner of the node process, its data directory,
//! and its log file. A reset always stops the process, wipes the data
//! directory, truncates the log, and boots a fresh node, so nothing from a
//! previous test case can be observed afterwards.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;

use crate::chain::PublicKey;
use crate::common::config::Config;
use crate::common::{paths, Error, Result};

use super::client::NodeClient;
use super::types::InfoResponse;

/// Manages a single local chain node process
pub struct NodeSupervisor {
    config: Config,
    /// Key installed on the system account at genesis
    genesis_key: PublicKey,
    /// Node state directory, wiped on every reset
    data_dir: PathBuf,
    /// Scratch directory backing `data_dir` when none is configured
    _scratch: Option<TempDir>,
    /// Where node output is written
    log_path: Option<PathBuf>,
    client: Option<NodeClient>,
}

impl NodeSupervisor {
    /// Create a supervisor; the node is not started until `start` or `reset`
    pub fn new(config: Config, genesis_key: PublicKey) -> Result<Self> {
        let (data_dir, scratch) = match &config.node.data_dir {
            Some(dir) => (dir.clone(), None),
            None => {
                let scratch = tempfile::Builder::new()
                    .prefix("chain-harness-node-")
                    .tempdir()?;
                (scratch.path().join("data"), Some(scratch))
            }
        };

        Ok(Self {
            config,
            genesis_key,
            data_dir,
            _scratch: scratch,
            log_path: None,
            client: None,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Current node log file, set by `reset`
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Whether a node process is alive
    pub fn is_running(&mut self) -> bool {
        self.client.as_mut().map(|c| c.is_running()).unwrap_or(false)
    }

    /// Launch the node, or do nothing if it is already running
    #[tracing::instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            tracing::debug!("Node already running");
            return Ok(());
        }
        // A dead process may still be held; drop it before respawning
        self.client = None;

        let node_path = self.config.node_executable()?;
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            Error::NodeStartFailed(format!(
                "Cannot create data dir '{}': {}",
                self.data_dir.display(),
                e
            ))
        })?;

        let mut args = vec![
            "--data-dir".to_string(),
            self.data_dir.display().to_string(),
            "--genesis-key".to_string(),
            self.genesis_key.to_string(),
        ];
        args.extend(self.config.node.args.iter().cloned());

        let stderr = match &self.log_path {
            Some(path) => Stdio::from(open_log_append(path)?),
            None => Stdio::null(),
        };

        let mut client = NodeClient::spawn(
            &node_path,
            &args,
            stderr,
            self.config.timeouts.request(),
        )
        .await?;

        let startup = self.config.timeouts.startup();
        let info = tokio::time::timeout(startup, client.info())
            .await
            .map_err(|_| {
                Error::NodeStartFailed(format!(
                    "Node did not answer its health check within {} seconds",
                    startup.as_secs()
                ))
            })?
            .map_err(|e| Error::NodeStartFailed(format!("Health check failed: {}", e)))?;

        tracing::info!(
            pid = ?client.pid(),
            chain_id = %info.chain_id,
            version = %info.server_version,
            head = info.head_block_num,
            "Node started"
        );

        self.client = Some(client);
        Ok(())
    }

    /// Clear all chain state back to genesis and send node output to `log_path`
    ///
    /// Any failure here is reported as `NodeReset` and is fatal to the test case.
    #[tracing::instrument(skip(self), fields(log = %log_path.display()))]
    pub async fn reset(&mut self, log_path: &Path) -> Result<()> {
        self.stop()
            .await
            .map_err(|e| Error::NodeReset(format!("Cannot stop node: {}", e)))?;

        if self.data_dir.exists() {
            std::fs::remove_dir_all(&self.data_dir).map_err(|e| {
                Error::NodeReset(format!(
                    "Cannot clear data dir '{}': {}",
                    self.data_dir.display(),
                    e
                ))
            })?;
        }

        paths::ensure_parent(log_path)
            .and_then(|_| File::create(log_path).map(drop))
            .map_err(|e| {
                Error::NodeReset(format!("Cannot open log '{}': {}", log_path.display(), e))
            })?;
        self.log_path = Some(log_path.to_path_buf());

        self.start().await.map_err(|e| match e {
            Error::NodeReset(_) => e,
            other => Error::NodeReset(other.to_string()),
        })?;

        tracing::info!("Node reset to genesis");
        Ok(())
    }

    /// Terminate the node and release its resources; safe to call repeatedly
    #[tracing::instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(mut client) = self.client.take() {
            client.terminate().await?;
            tracing::info!("Node stopped");
        }
        Ok(())
    }

    /// Round-trip an `info` request
    pub async fn health_check(&mut self) -> Result<InfoResponse> {
        self.client()?.info().await
    }

    /// Access the running node's client
    pub fn client(&mut self) -> Result<&mut NodeClient> {
        match self.client.as_mut() {
            Some(client) => {
                if client.is_running() {
                    Ok(client)
                } else {
                    Err(Error::NodeCrashed)
                }
            }
            None => Err(Error::NodeNotRunning),
        }
    }
}

fn open_log_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::NodeStartFailed(format!("Cannot open log '{}': {}", path.display(), e)))
}
