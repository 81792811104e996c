//! Chain harness CLI
//!
//! Runs YAML contract scenarios against a local chain node and builds
//! contract artifacts.

use clap::Parser;
use chain_harness::common::logging;
use chain_harness::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "chain-harness", about = "End-to-end contract scenario harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Keep the file writer alive until exit
    let _guard = match &cli.command {
        Commands::Run {
            log_dir: Some(dir), ..
        } => match logging::init_with_file(dir) {
            Ok((guard, path)) => {
                tracing::debug!(path = %path.display(), "harness trace enabled");
                Some(guard)
            }
            Err(e) => {
                logging::init_cli();
                tracing::warn!("cannot open log directory {}: {}", dir.display(), e);
                None
            }
        },
        _ => {
            logging::init_cli();
            None
        }
    };

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
