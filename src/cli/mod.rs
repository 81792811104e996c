//! CLI command handling
//!
//! Dispatches CLI commands and formats their output.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Error, Result};
use crate::contract::{builder, ContractPipeline};
use crate::scenario::{run_scenario, TestResult};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            paths,
            verbose,
            log_dir,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let log_dir = log_dir
                .or_else(paths::log_dir)
                .unwrap_or_else(|| std::env::temp_dir().join("chain-harness"));
            run(&paths, &config, &log_dir, verbose).await
        }

        Commands::Build { source, config } => {
            let config = load_config(config.as_deref())?;
            let mut pipeline = ContractPipeline::new(builder::from_config(&config.builder));
            let result = pipeline.build(&source).await?;
            let abi = crate::contract::Abi::parse(&result.artifact.abi)?;

            println!("Built {}", result.name().white().bold());
            println!("  code hash: {}", result.artifact.code_hash);
            println!("  code size: {} bytes", result.artifact.code.len());
            let actions: Vec<&str> = abi.action_names().map(|n| n.as_str()).collect();
            if actions.is_empty() {
                println!("  actions:   (none)");
            } else {
                println!("  actions:   {}", actions.join(", "));
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_path(path),
        None => Config::load(),
    }
}

/// Run each scenario and print a summary; fails if any scenario failed
async fn run(scenarios: &[PathBuf], config: &Config, log_dir: &Path, verbose: bool) -> Result<()> {
    let mut results: Vec<TestResult> = Vec::with_capacity(scenarios.len());
    for path in scenarios {
        let result = run_scenario(path, config, log_dir, verbose).await?;
        if !result.passed {
            println!(
                "  {} see node log {}",
                "→".dimmed(),
                result.log_path.display()
            );
        }
        results.push(result);
    }

    let failed: Vec<&TestResult> = results.iter().filter(|r| !r.passed).collect();
    println!(
        "{} {} passed, {} failed",
        "Summary:".bold(),
        results.len() - failed.len(),
        failed.len()
    );
    for result in &failed {
        println!(
            "  {} {} (step {}/{}): {}",
            "✗".red(),
            result.name,
            result.steps_run,
            result.steps_total,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(Error::TestAssertion(format!(
            "{} of {} scenarios failed",
            failed.len(),
            results.len()
        )))
    }
}
