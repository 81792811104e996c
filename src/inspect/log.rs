//! Node log file access

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::common::{Error, Result};

/// Interval between reads while waiting for a log line
const LOG_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Read access to the node output of the current test case
#[derive(Debug, Clone)]
pub struct NodeLog {
    path: PathBuf,
}

impl NodeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every line written so far; a missing file reads as empty
    pub fn lines(&self) -> Result<Vec<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::FileRead {
                path: self.path.display().to_string(),
                error: e.to_string(),
            }),
        }
    }

    /// Whether any line contains `pattern`
    pub fn contains(&self, pattern: &str) -> Result<bool> {
        Ok(self.lines()?.iter().any(|line| line.contains(pattern)))
    }

    /// Wait until a line containing `pattern` appears and return it
    pub async fn wait_for(&self, pattern: &str, timeout: Duration) -> Result<String> {
        let started = Instant::now();
        loop {
            if let Some(line) = self.lines()?.into_iter().find(|l| l.contains(pattern)) {
                return Ok(line);
            }
            if started.elapsed() >= timeout {
                return Err(Error::Timeout(timeout.as_secs()));
            }
            tokio::time::sleep(LOG_POLL_INTERVAL).await;
        }
    }
}
