//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Chain node process settings
    #[serde(default)]
    pub node: NodeConfig,

    /// Contract build tool settings
    #[serde(default)]
    pub builder: BuilderConfig,

    /// Well-known contract sources for convenience setups
    #[serde(default)]
    pub contracts: ContractsConfig,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Configuration for the chain node process
#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    /// Path or name of the node executable
    #[serde(default = "default_node_path")]
    pub path: PathBuf,

    /// Additional arguments to pass to the node
    #[serde(default)]
    pub args: Vec<String>,

    /// Data directory; a scratch directory is used when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            path: default_node_path(),
            args: Vec::new(),
            data_dir: None,
        }
    }
}

fn default_node_path() -> PathBuf {
    PathBuf::from("mock_node")
}

/// Configuration for the contract build tool
#[derive(Debug, Deserialize, Default, Clone)]
pub struct BuilderConfig {
    /// Compiler executable; prebuilt artifacts are loaded when unset
    #[serde(default)]
    pub program: Option<PathBuf>,

    /// Extra compiler arguments, placed before the output and source paths
    #[serde(default)]
    pub args: Vec<String>,

    /// Where compiled artifacts are written
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
}

/// Sources for the packaged contract setups
#[derive(Debug, Deserialize, Clone)]
pub struct ContractsConfig {
    /// Directory holding contract sources
    #[serde(default = "default_contracts_dir")]
    pub dir: PathBuf,

    /// Token contract source, relative to `dir`
    #[serde(default = "default_token_source")]
    pub token: PathBuf,

    /// Burn-pool contract source, relative to `dir`
    #[serde(default = "default_burnpool_source")]
    pub burnpool: PathBuf,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            dir: default_contracts_dir(),
            token: default_token_source(),
            burnpool: default_burnpool_source(),
        }
    }
}

fn default_contracts_dir() -> PathBuf {
    PathBuf::from("contracts")
}
fn default_token_source() -> PathBuf {
    PathBuf::from("amax.token")
}
fn default_burnpool_source() -> PathBuf {
    PathBuf::from("entu.burnpool")
}

impl ContractsConfig {
    /// Full path to the token contract source
    pub fn token_path(&self) -> PathBuf {
        self.dir.join(&self.token)
    }

    /// Full path to the burn-pool contract source
    pub fn burnpool_path(&self) -> PathBuf {
        self.dir.join(&self.burnpool)
    }
}

/// Default settings
#[derive(Debug, Deserialize, Clone)]
pub struct Defaults {
    /// Token contract used for transfers of symbols no contract has claimed
    #[serde(default = "default_token_contract")]
    pub token_contract: String,

    /// Name given to the first master account of a reset cycle
    #[serde(default = "default_master_name")]
    pub master_name: String,

    /// Prefix for auto-generated account names
    #[serde(default = "default_factory_prefix")]
    pub factory_prefix: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            token_contract: default_token_contract(),
            master_name: default_master_name(),
            factory_prefix: default_factory_prefix(),
        }
    }
}

fn default_token_contract() -> String {
    "amax.token".to_string()
}
fn default_master_name() -> String {
    "master".to_string()
}
fn default_factory_prefix() -> String {
    "tst".to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Time allowed for the node to answer its first health check
    #[serde(default = "default_startup")]
    pub startup_secs: u64,

    /// Timeout for a single node request
    #[serde(default = "default_request")]
    pub request_secs: u64,

    /// Time allowed for a submitted transaction to be included
    #[serde(default = "default_inclusion")]
    pub inclusion_secs: u64,

    /// Delay between transaction status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            startup_secs: default_startup(),
            request_secs: default_request(),
            inclusion_secs: default_inclusion(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_startup() -> u64 {
    10
}
fn default_request() -> u64 {
    30
}
fn default_inclusion() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    25
}

impl Timeouts {
    pub fn startup(&self) -> Duration {
        Duration::from_secs(self.startup_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn inclusion(&self) -> Duration {
        Duration::from_secs(self.inclusion_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    ///
    /// Relative contract and node paths are resolved against the file's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;

        if let Some(base) = path.parent() {
            config.contracts.dir = super::paths::resolve(base, &config.contracts.dir);
        }
        Ok(config)
    }

    /// Resolve the node executable
    ///
    /// Paths with a directory component are used as-is; bare names are
    /// searched for in PATH.
    pub fn node_executable(&self) -> Result<PathBuf> {
        let path = &self.node.path;
        if path.components().count() > 1 || path.is_absolute() {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(Error::node_not_found(
                &path.display().to_string(),
                &[path.display().to_string()],
            ));
        }

        let name = path.display().to_string();
        which::which(&name).map_err(|_| {
            let searched = std::env::var("PATH").unwrap_or_default();
            Error::node_not_found(&name, &[searched])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.defaults.token_contract, "amax.token");
        assert_eq!(config.defaults.master_name, "master");
        assert_eq!(config.timeouts.inclusion(), Duration::from_secs(30));
        assert_eq!(config.contracts.token_path(), PathBuf::from("contracts/amax.token"));
    }

    #[test]
    fn test_from_path_resolves_contract_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[node]
path = "/opt/chain/bin/nodeos"
args = ["--verbose"]

[contracts]
dir = "fixtures"

[timeouts]
inclusion_secs = 5
poll_interval_ms = 10
"#,
        )
        .unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.node.args, vec!["--verbose".to_string()]);
        assert_eq!(config.contracts.dir, dir.path().join("fixtures"));
        assert_eq!(config.timeouts.inclusion_secs, 5);
        assert_eq!(config.timeouts.poll_interval(), Duration::from_millis(10));
        // Untouched sections keep their defaults
        assert_eq!(config.timeouts.startup_secs, 10);
    }

    #[test]
    fn test_invalid_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeouts]\ninclusion_secs = \"soon\"\n").unwrap();
        assert!(matches!(Config::from_path(&path), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_missing_node_executable() {
        let mut config = Config::default();
        config.node.path = PathBuf::from("/definitely/not/here/nodeos");
        assert!(matches!(
            config.node_executable(),
            Err(Error::NodeNotFound { .. })
        ));
    }
}
