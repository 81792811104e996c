//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Execute scenarios defined in YAML files
    Run {
        /// Scenario files, run in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,

        /// Directory for node logs and the harness trace
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Config file (default: the user config directory)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Build a contract and print its code hash and actions
    Build {
        /// Contract source file or directory
        source: PathBuf,

        /// Config file (default: the user config directory)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}
