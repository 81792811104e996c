//! YAML scenario runner
//!
//! Loads a scenario file, resets the node into a per-scenario log, executes
//! the steps in order against a [`Scenario`] context, and always stops the
//! node afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use serde_json::Value;

use crate::chain::{Asset, Authority, Name, PermissionLevel, PublicKey};
use crate::common::config::Config;
use crate::common::{paths, Error, Result};
use crate::contract::{BuildResult, ContractHandle};

use super::config::{DelegateSpec, Expectation, KeySpec, ScenarioFile, Step};
use super::context::Scenario;

/// Result of a scenario run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
    pub log_path: PathBuf,
}

/// Load a scenario file
pub fn load_scenario(path: &Path) -> Result<ScenarioFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read scenario '{}': {}",
            path.display(),
            e
        ))
    })?;

    serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse scenario '{}': {}", path.display(), e)))
}

/// Run a scenario file
///
/// Step failures are reported in the returned [`TestResult`]; only errors
/// that prevent the scenario from running at all (unreadable file, node
/// reset failure) are returned as `Err`.
pub async fn run_scenario(
    path: &Path,
    config: &Config,
    log_dir: &Path,
    verbose: bool,
) -> Result<TestResult> {
    let scenario = load_scenario(path)?;
    let steps_total = scenario.steps.len();
    let base_dir = path.parent().unwrap_or(Path::new("."));

    let log_path = match &scenario.log {
        Some(log) => paths::resolve(base_dir, log),
        None => log_dir.join(format!("{}.log", sanitize(&scenario.name))),
    };

    println!(
        "\n{} {}",
        "Running Scenario:".blue().bold(),
        scenario.name.white().bold()
    );

    let mut ctx = Scenario::new(config.clone())?;
    if let Some(description) = &scenario.description {
        ctx.scenario(description);
    }

    if let Err(e) = ctx.reset(&log_path).await {
        let _ = ctx.stop().await;
        return Err(e);
    }
    if verbose {
        println!("  Node log: {}", log_path.display().to_string().dimmed());
    }

    let mut state = RunState::new(base_dir.to_path_buf());
    println!("\n{}", "Steps:".cyan());

    let mut outcome = TestResult {
        name: scenario.name.clone(),
        passed: true,
        steps_run: steps_total,
        steps_total,
        error: None,
        log_path: log_path.clone(),
    };

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;
        if let Err(e) = execute_step(&mut ctx, &mut state, step, step_num, verbose).await {
            println!("  {} Step {}: {}", "✗".red(), step_num, e);
            outcome.passed = false;
            outcome.steps_run = step_num;
            outcome.error = Some(e.to_string());
            break;
        }
    }

    if let Err(e) = ctx.stop().await {
        tracing::warn!("Failed to stop node: {}", e);
    }

    if outcome.passed {
        println!(
            "\n{} {}\n",
            "✓".green().bold(),
            "Scenario Passed".green().bold()
        );
    }
    Ok(outcome)
}

/// Names and handles produced by earlier steps
struct RunState {
    base_dir: PathBuf,
    aliases: HashMap<String, Name>,
    builds: HashMap<String, BuildResult>,
    contracts: HashMap<Name, ContractHandle>,
}

impl RunState {
    fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            aliases: HashMap::new(),
            builds: HashMap::new(),
            contracts: HashMap::new(),
        }
    }

    /// Replace every `${alias}` with the aliased account name
    fn substitute(&self, input: &str) -> Result<String> {
        let mut output = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| Error::Config(format!("Unclosed '${{' in '{}'", input)))?;
            let alias = &after[..end];
            let name = self
                .aliases
                .get(alias)
                .ok_or_else(|| Error::Config(format!("Unknown alias '{}'", alias)))?;
            output.push_str(name.as_str());
            rest = &after[end + 1..];
        }
        output.push_str(rest);
        Ok(output)
    }

    /// Substitute aliases in every string of a JSON value
    fn substitute_value(&self, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.substitute(s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.substitute_value(v))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.substitute_value(v)?);
                }
                Value::Object(out)
            }
            other => other.clone(),
        })
    }

    /// An account reference: a bare alias, or a name after substitution
    fn name(&self, reference: &str) -> Result<Name> {
        if let Some(name) = self.aliases.get(reference) {
            return Ok(name.clone());
        }
        Name::new(&self.substitute(reference)?)
    }

    fn permission(&self, reference: &str) -> Result<PermissionLevel> {
        let substituted = self.substitute(reference)?;
        match substituted.split_once('@') {
            Some((actor, permission)) => Ok(PermissionLevel::new(
                self.name(actor)?,
                Name::new(permission)?,
            )),
            None => Ok(PermissionLevel::active(&self.name(&substituted)?)),
        }
    }

    fn remember(&mut self, alias: &Option<String>, name: &Name) {
        if let Some(alias) = alias {
            self.aliases.insert(alias.clone(), name.clone());
        }
    }
}

/// Execute a single step, applying its expectation
async fn execute_step(
    ctx: &mut Scenario,
    state: &mut RunState,
    step: &Step,
    step_num: usize,
    verbose: bool,
) -> Result<()> {
    let expect = step_expectation(step);
    let result = perform_step(ctx, state, step).await;

    match (result, expect) {
        (Ok(summary), Some(exp)) if exp.expects_failure() => Err(Error::TestAssertion(format!(
            "expected failure, but '{}' succeeded",
            summary
        ))),
        (Ok(summary), _) => {
            println!("  {} Step {}: {}", "✓".green(), step_num, summary.dimmed());
            Ok(())
        }
        (Err(e), Some(exp)) if exp.expects_failure() && e.is_expectable() => {
            let message = e.to_string();
            if let Some(needle) = &exp.error_contains {
                if !message.contains(needle.as_str()) {
                    return Err(Error::TestAssertion(format!(
                        "expected error containing '{}', got '{}'",
                        needle, message
                    )));
                }
            }
            println!(
                "  {} Step {}: {} (expected failure)",
                "✓".green(),
                step_num,
                step_label(step).dimmed()
            );
            if verbose {
                println!("      {}", message.dimmed());
            }
            Ok(())
        }
        (Err(e), _) => Err(e),
    }
}

fn step_expectation(step: &Step) -> Option<&Expectation> {
    match step {
        Step::NewMasterAccount { expect, .. }
        | Step::NewAccount { expect, .. }
        | Step::UpdateAuth { expect, .. }
        | Step::Build { expect, .. }
        | Step::Deploy { expect, .. }
        | Step::SetupToken { expect, .. }
        | Step::SetupBurnpool { expect, .. }
        | Step::PushAction { expect, .. }
        | Step::Transfer { expect, .. } => expect.as_ref(),
        _ => None,
    }
}

fn step_label(step: &Step) -> String {
    match step {
        Step::NewMasterAccount { .. } => "new_master_account".to_string(),
        Step::NewAccount { parent, name, .. } => format!(
            "new_account {} <- {}",
            name.as_deref().unwrap_or("<factory>"),
            parent
        ),
        Step::UpdateAuth { account, permission, .. } => {
            format!("update_auth {}@{}", account, permission)
        }
        Step::Build { source, .. } => format!("build {}", source.display()),
        Step::Deploy { build, account, .. } => format!("deploy {} -> {}", build, account),
        Step::SetupToken { .. } => "setup_token".to_string(),
        Step::SetupBurnpool { .. } => "setup_burnpool".to_string(),
        Step::PushAction { contract, name, .. } => format!("{}::{}", contract, name),
        Step::Transfer { from, to, quantity, .. } => {
            format!("transfer {} {} -> {}", quantity, from, to)
        }
        Step::AssertBalance { account, symbol, .. } => {
            format!("assert_balance {} {}", account, symbol)
        }
        Step::AssertTable { code, table, .. } => format!("assert_table {}::{}", code, table),
        Step::CheckLog { contains, .. } => format!("check_log '{}'", contains),
        Step::Comment { .. } => "comment".to_string(),
        Step::Sleep { ms } => format!("sleep {}ms", ms),
    }
}

/// Run a step and describe what it did
async fn perform_step(ctx: &mut Scenario, state: &mut RunState, step: &Step) -> Result<String> {
    match step {
        Step::NewMasterAccount { alias, .. } => {
            let account = ctx.new_master_account().await?;
            state.remember(alias, &account.name);
            Ok(format!("new_master_account -> {}", account.name))
        }

        Step::NewAccount {
            parent,
            name,
            alias,
            ..
        } => {
            let parent = ctx.account(&state.name(parent)?)?.clone();
            let account = match name {
                Some(name) => ctx.new_account(&parent, &state.substitute(name)?).await?,
                None => ctx.new_factory_account(&parent).await?,
            };
            state.remember(alias, &account.name);
            Ok(format!("new_account {} <- {}", account.name, parent.name))
        }

        Step::UpdateAuth {
            account,
            permission,
            parent,
            threshold,
            keys,
            accounts,
            ..
        } => {
            let target = ctx.account(&state.name(account)?)?.clone();
            let authority = build_authority(ctx, state, *threshold, keys, accounts)?;
            ctx.update_auth(&target, permission, parent.as_deref(), authority)
                .await?;
            Ok(format!("update_auth {}@{}", target.name, permission))
        }

        Step::Build { source, alias, .. } => {
            let source = paths::resolve(&state.base_dir, source);
            let build = ctx.build(&source).await?;
            let summary = format!("build {} ({})", build.name(), &build.artifact.code_hash[..12]);
            let key = alias.clone().unwrap_or_else(|| build.name().to_string());
            state.builds.insert(key, build);
            Ok(summary)
        }

        Step::Deploy {
            build,
            account,
            alias,
            ..
        } => {
            let artifact = state
                .builds
                .get(build)
                .cloned()
                .ok_or_else(|| Error::Config(format!("No build named '{}'", build)))?;
            let target = ctx.account(&state.name(account)?)?.clone();
            let handle = ctx.deploy(&artifact, &target).await?;
            state.remember(alias, &handle.account);
            state.contracts.insert(handle.account.clone(), handle);
            Ok(format!("deploy {} -> {}", artifact.name(), target.name))
        }

        Step::SetupToken { account, alias, .. } => {
            let account = account.as_deref().map(|a| state.substitute(a)).transpose()?;
            let token = ctx.setup_token(account.as_deref()).await?;
            let handle = token.handle().clone();
            state.remember(alias, &handle.account);
            let summary = format!("setup_token -> {}", handle.account);
            state.contracts.insert(handle.account.clone(), handle);
            Ok(summary)
        }

        Step::SetupBurnpool { account, alias, .. } => {
            let account = account.as_deref().map(|a| state.substitute(a)).transpose()?;
            let pool = ctx.setup_burnpool(account.as_deref()).await?;
            let handle = pool.handle().clone();
            state.remember(alias, &handle.account);
            let summary = format!("setup_burnpool -> {}", handle.account);
            state.contracts.insert(handle.account.clone(), handle);
            Ok(summary)
        }

        Step::PushAction {
            contract,
            name,
            data,
            authorization,
            ..
        } => {
            let contract = state.name(contract)?;
            let data = state.substitute_value(data)?;
            let authorizers = authorization
                .iter()
                .map(|a| state.permission(a))
                .collect::<Result<Vec<_>>>()?;

            let receipt = match state.contracts.get(&contract) {
                Some(handle) => {
                    ctx.push_action(handle, name, data.clone(), &authorizers)
                        .await?
                }
                None => {
                    ctx.push_raw_action(&contract, name, data.clone(), &authorizers)
                        .await?
                }
            };

            // A created symbol is routed to its token contract, as TokenContract::create does
            if name == "create" {
                if let Some(supply) = data.get("maximum_supply").and_then(Value::as_str) {
                    if let Ok(asset) = supply.parse::<Asset>() {
                        ctx.route_symbol(asset.symbol.code, contract.clone());
                    }
                }
            }

            Ok(format!("{}::{} in block {}", contract, name, receipt.block_num))
        }

        Step::Transfer {
            from,
            to,
            quantity,
            memo,
            ..
        } => {
            let sender = ctx.account(&state.name(from)?)?.clone();
            let recipient = state.name(to)?;
            let memo = state.substitute(memo)?;
            ctx.transfer(&sender, &recipient, quantity, &memo).await?;
            Ok(format!("transfer {} {} -> {}", quantity, sender.name, recipient))
        }

        Step::AssertBalance {
            account,
            symbol,
            equals,
            contract,
        } => {
            let account = state.name(account)?;
            let balance = match contract {
                Some(contract) => {
                    let contract = state.name(contract)?;
                    ctx.get_balance_on(&contract, &account, symbol).await?
                }
                None => ctx.get_balance(&account, symbol).await?,
            };
            let expected: Asset = equals.parse()?;
            if balance != expected {
                return Err(Error::TestAssertion(format!(
                    "{} holds {}, expected {}",
                    account, balance, expected
                )));
            }
            Ok(format!("{} holds {}", account, balance))
        }

        Step::AssertTable {
            code,
            scope,
            table,
            rows,
            contains,
        } => {
            let code = state.name(code)?;
            let scope = state.substitute(scope)?;
            let found = ctx.read_table(&code, &scope, table).await?;

            if let Some(expected) = rows {
                if found.len() != *expected {
                    return Err(Error::TestAssertion(format!(
                        "{}::{} in scope '{}' has {} rows, expected {}",
                        code,
                        table,
                        scope,
                        found.len(),
                        expected
                    )));
                }
            }
            if let Some(pattern) = contains {
                let pattern = state.substitute_value(pattern)?;
                if !found.iter().any(|row| row_matches(row, &pattern)) {
                    return Err(Error::TestAssertion(format!(
                        "no row of {}::{} matches {}",
                        code, table, pattern
                    )));
                }
            }
            Ok(format!("{}::{} has {} rows", code, table, found.len()))
        }

        Step::CheckLog {
            contains,
            timeout_ms,
        } => {
            let pattern = state.substitute(contains)?;
            let line = ctx
                .log()?
                .wait_for(&pattern, Duration::from_millis(*timeout_ms))
                .await
                .map_err(|e| match e {
                    Error::Timeout(_) => Error::TestAssertion(format!(
                        "node log has no line containing '{}'",
                        pattern
                    )),
                    other => other,
                })?;
            Ok(format!("log: {}", line.trim()))
        }

        Step::Comment { text } => {
            ctx.comment(text);
            Ok("comment".to_string())
        }

        Step::Sleep { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            Ok(format!("sleep {}ms", ms))
        }
    }
}

fn build_authority(
    ctx: &Scenario,
    state: &RunState,
    threshold: u32,
    keys: &[KeySpec],
    accounts: &[DelegateSpec],
) -> Result<Authority> {
    let mut authority = Authority {
        threshold,
        keys: Vec::new(),
        accounts: Vec::new(),
    };
    for spec in keys {
        let key: PublicKey = match spec.key.parse() {
            Ok(key) => key,
            Err(_) => ctx.account(&state.name(&spec.key)?)?.public_key,
        };
        authority = authority.with_key(key, spec.weight);
    }
    for spec in accounts {
        authority = authority.with_account(state.permission(&spec.permission)?, spec.weight);
    }
    Ok(authority)
}

/// Whether every field of `pattern` appears in `row` with an equal value
///
/// Strings compare as written, so `"6,MUSDT"` matches a symbol field.
fn row_matches(row: &Value, pattern: &Value) -> bool {
    match (row, pattern) {
        (Value::Object(row), Value::Object(pattern)) => pattern
            .iter()
            .all(|(k, v)| row.get(k).map(|r| row_matches(r, v)).unwrap_or(false)),
        (Value::String(a), Value::Number(b)) | (Value::Number(b), Value::String(a)) => {
            *a == b.to_string()
        }
        (a, b) => a == b,
    }
}

/// File-name-safe form of a scenario name
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
