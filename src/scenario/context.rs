//! Per-test scenario context
//!
//! A [`Scenario`] owns every harness component for one test case: the node
//! supervisor, the account registry, the contract pipeline, and the
//! transaction executor. Operations are awaited one at a time, in the order
//! the test issues them.

use std::path::{Path, PathBuf};

use colored::Colorize;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::accounts::{Account, AccountPlan, AccountRegistry, AuthorityMember};
use crate::chain::{
    Asset, Authority, KeyPair, Name, Permission, PermissionLevel, SymbolCode, SYSTEM_ACCOUNT,
};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::contract::builder;
use crate::contract::{Abi, BuildResult, BurnPoolContract, ContractHandle, ContractPipeline, TokenContract};
use crate::inspect::{self, NodeLog};
use crate::node::{AccountInfo, InfoResponse, NodeClient, NodeSupervisor};
use crate::tx::{Invocation, Receipt, TransactionExecutor};

/// Everything one test case needs, passed explicitly
pub struct Scenario {
    config: Config,
    /// Genesis key of the system account
    system_key: KeyPair,
    supervisor: NodeSupervisor,
    registry: AccountRegistry,
    pipeline: ContractPipeline,
    executor: TransactionExecutor,
}

impl Scenario {
    pub fn new(config: Config) -> Result<Self> {
        let system_key = KeyPair::generate();
        let supervisor = NodeSupervisor::new(config.clone(), system_key.public())?;
        let mut registry = AccountRegistry::new(config.defaults.clone());
        registry.reset(&system_key);
        let pipeline = ContractPipeline::new(builder::from_config(&config.builder));
        let executor = TransactionExecutor::new(
            &config.timeouts,
            Name::new(&config.defaults.token_contract)?,
        );

        Ok(Self {
            config,
            system_key,
            supervisor,
            registry,
            pipeline,
            executor,
        })
    }

    /// Run `body` against a freshly reset node, always stopping it afterwards
    ///
    /// The body's error wins over a failure to stop.
    pub async fn run<F>(config: Config, log_path: &Path, body: F) -> Result<()>
    where
        F: for<'a> FnOnce(&'a mut Scenario) -> BoxFuture<'a, Result<()>>,
    {
        let mut ctx = Scenario::new(config)?;
        let outcome = match ctx.reset(log_path).await {
            Ok(()) => body(&mut ctx).await,
            Err(e) => Err(e),
        };
        let stopped = ctx.stop().await;
        outcome.and(stopped)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Lifecycle ===

    /// Start the node if it is not running
    pub async fn start(&mut self) -> Result<()> {
        self.supervisor.start().await
    }

    /// Return the chain to genesis and forget every harness-side record
    pub async fn reset(&mut self, log_path: impl AsRef<Path>) -> Result<()> {
        self.supervisor.reset(log_path.as_ref()).await?;
        self.registry.reset(&self.system_key);
        self.executor.reset();
        Ok(())
    }

    /// Stop the node; safe to call repeatedly
    pub async fn stop(&mut self) -> Result<()> {
        self.supervisor.stop().await
    }

    pub async fn health_check(&mut self) -> Result<InfoResponse> {
        self.supervisor.health_check().await
    }

    // === Annotations ===

    /// Print a scenario banner
    pub fn scenario(&self, description: &str) {
        let text = dedent(description);
        tracing::info!(target: "chain_harness::scenario", "{}", text);
        println!("\n{}", "SCENARIO".magenta().bold());
        for line in text.lines() {
            println!("  {}", line.white());
        }
    }

    /// Print a comment marker
    pub fn comment(&self, text: &str) {
        let text = dedent(text);
        tracing::info!(target: "chain_harness::comment", "{}", text);
        println!("\n{}", "COMMENT".cyan().bold());
        for line in text.lines() {
            println!("  {}", line.dimmed());
        }
    }

    // === Accounts ===

    /// Create a root account, created by the system account
    pub async fn new_master_account(&mut self) -> Result<Account> {
        let plan = self.registry.plan_master_account()?;
        self.create_account(plan).await
    }

    /// Create a named child of `parent`
    pub async fn new_account(&mut self, parent: &Account, name: &str) -> Result<Account> {
        let plan = self.registry.plan_account(&parent.name, Some(name))?;
        self.create_account(plan).await
    }

    /// Create a child of `parent` with a generated name
    pub async fn new_factory_account(&mut self, parent: &Account) -> Result<Account> {
        let plan = self.registry.plan_account(&parent.name, None)?;
        self.create_account(plan).await
    }

    async fn create_account(&mut self, plan: AccountPlan) -> Result<Account> {
        let action = plan.action();
        let client = self.supervisor.client()?;
        self.executor
            .execute(client, &self.registry, vec![action])
            .await?;
        let account = self.registry.commit(plan)?;
        tracing::info!(account = %account.name, "Created account");
        Ok(account)
    }

    /// Install or replace a permission of `account`
    pub async fn update_auth(
        &mut self,
        account: &Account,
        permission: &str,
        parent: Option<&str>,
        authority: Authority,
    ) -> Result<Account> {
        let permission = Permission {
            name: Name::new(permission)?,
            parent: parent.map(Name::new).transpose()?,
            authority,
        };
        let action = self.registry.update_auth_action(&account.name, &permission)?;
        let client = self.supervisor.client()?;
        self.executor
            .execute(client, &self.registry, vec![action])
            .await?;
        self.registry.record_permission(&account.name, permission)?;
        Ok(self.registry.get(&account.name)?.clone())
    }

    /// Whether `member` transitively satisfies `level`
    pub fn authorizes(&self, level: &PermissionLevel, member: &AuthorityMember) -> bool {
        self.registry.authorizes(level, member)
    }

    pub fn account(&self, name: &Name) -> Result<&Account> {
        self.registry.get(name)
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    // === Contracts ===

    /// Build a contract source, reusing a cached artifact if present
    pub async fn build(&mut self, source: impl AsRef<Path>) -> Result<BuildResult> {
        self.pipeline.build(source.as_ref()).await
    }

    /// Deploy a built contract to `target`
    pub async fn deploy(&mut self, build: &BuildResult, target: &Account) -> Result<ContractHandle> {
        let client = self.supervisor.client()?;
        build
            .deploy(&mut self.executor, client, &self.registry, &target.name)
            .await
    }

    /// Build, create a dedicated account for, and deploy a packaged contract
    ///
    /// The account is named after the contract unless `account` is given.
    async fn setup_contract(&mut self, source: PathBuf, account: Option<&str>) -> Result<ContractHandle> {
        let build = self.pipeline.build(&source).await?;
        let name = account.unwrap_or(build.name()).to_string();
        let system = Name::from_static(SYSTEM_ACCOUNT);
        let plan = self.registry.plan_account(&system, Some(&name))?;
        let target = self.create_account(plan).await?;
        self.deploy(&build, &target).await
    }

    /// Deploy the configured token contract
    pub async fn setup_token(&mut self, account: Option<&str>) -> Result<TokenContract> {
        let source = self.config.contracts.token_path();
        let handle = self.setup_contract(source, account).await?;
        TokenContract::new(handle)
    }

    /// Deploy the configured burn-pool contract
    pub async fn setup_burnpool(&mut self, account: Option<&str>) -> Result<BurnPoolContract> {
        let source = self.config.contracts.burnpool_path();
        let handle = self.setup_contract(source, account).await?;
        BurnPoolContract::new(handle)
    }

    // === Transactions ===

    /// Submit an invocation and wait for it to be included
    pub async fn invoke(&mut self, invocation: Invocation) -> Result<Receipt> {
        let client = self.supervisor.client()?;
        self.executor.invoke(client, &self.registry, invocation).await
    }

    /// Call an action declared by `contract`'s ABI
    pub async fn push_action(
        &mut self,
        contract: &ContractHandle,
        action: &str,
        data: Value,
        authorizers: &[PermissionLevel],
    ) -> Result<Receipt> {
        let invocation = contract.invocation(action, data, authorizers)?;
        self.invoke(invocation).await
    }

    /// Call an action on any account, without checking an ABI
    pub async fn push_raw_action(
        &mut self,
        contract: &Name,
        action: &str,
        data: Value,
        authorizers: &[PermissionLevel],
    ) -> Result<Receipt> {
        let client = self.supervisor.client()?;
        self.executor
            .push_action(client, &self.registry, contract, action, data, authorizers)
            .await
    }

    /// Transfer `quantity` (e.g. `"6.000000 MUSDT"`) from `from` to `to`
    pub async fn transfer(
        &mut self,
        from: &Account,
        to: &impl AsRef<Name>,
        quantity: &str,
        memo: &str,
    ) -> Result<Receipt> {
        let quantity: Asset = quantity.parse()?;
        let client = self.supervisor.client()?;
        self.executor
            .transfer(client, &self.registry, &from.name, to.as_ref(), &quantity, memo)
            .await
    }

    /// Operations performed as `account`
    pub fn on<'a>(&'a mut self, account: &'a Account) -> AccountScope<'a> {
        AccountScope { ctx: self, account }
    }

    /// Claim a symbol for a token contract, so transfers of it route there
    pub fn route_symbol(&mut self, code: SymbolCode, contract: Name) {
        self.executor.router_mut().register(code, contract);
    }

    /// Receipts of every confirmed transaction since the last reset
    pub fn history(&self) -> &[Receipt] {
        self.executor.history()
    }

    // === State ===

    /// Balance of `symbol` held by `account`, read from the node
    ///
    /// Queries the token contract that created the symbol.
    pub async fn get_balance(&mut self, account: &impl AsRef<Name>, symbol: &str) -> Result<Asset> {
        let code: SymbolCode = symbol.parse()?;
        let contract = self.executor.router().route(&code).clone();
        self.get_balance_on(&contract, account, symbol).await
    }

    /// Balance of `symbol` held by `account` on a specific token contract
    pub async fn get_balance_on(
        &mut self,
        contract: &Name,
        account: &impl AsRef<Name>,
        symbol: &str,
    ) -> Result<Asset> {
        let code: SymbolCode = symbol.parse()?;
        let client = self.supervisor.client()?;
        inspect::get_balance(client, &mut self.registry, contract, account.as_ref(), &code).await
    }

    /// Rows of a contract table; empty if the table or scope does not exist
    pub async fn read_table(&mut self, code: &Name, scope: &str, table: &str) -> Result<Vec<Value>> {
        let table = Name::new(table)?;
        let client = self.supervisor.client()?;
        inspect::read_table(client, code, scope, &table).await
    }

    /// The node's view of `account`
    pub async fn account_info(&mut self, account: &impl AsRef<Name>) -> Result<AccountInfo> {
        let client = self.supervisor.client()?;
        inspect::account_info(client, account.as_ref()).await
    }

    /// The ABI deployed on `account`, if any
    pub async fn deployed_abi(&mut self, account: &impl AsRef<Name>) -> Result<Option<Abi>> {
        let client = self.supervisor.client()?;
        inspect::deployed_abi(client, account.as_ref()).await
    }

    /// The current test case's node log
    pub fn log(&self) -> Result<NodeLog> {
        self.supervisor
            .log_path()
            .map(NodeLog::new)
            .ok_or(Error::NodeNotRunning)
    }

    /// Direct access to the node client
    pub fn client(&mut self) -> Result<&mut NodeClient> {
        self.supervisor.client()
    }
}

/// Shorthand for operations authorized by one account
pub struct AccountScope<'a> {
    ctx: &'a mut Scenario,
    account: &'a Account,
}

impl AccountScope<'_> {
    pub async fn transfer(self, to: &impl AsRef<Name>, quantity: &str, memo: &str) -> Result<Receipt> {
        self.ctx.transfer(self.account, to, quantity, memo).await
    }

    pub async fn balance(self, symbol: &str) -> Result<Asset> {
        self.ctx.get_balance(self.account, symbol).await
    }
}

impl AsRef<Name> for Account {
    fn as_ref(&self) -> &Name {
        &self.name
    }
}

impl AsRef<Name> for ContractHandle {
    fn as_ref(&self) -> &Name {
        &self.account
    }
}

/// Strip common indentation from triple-quoted style annotations
fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| strip_indent(l, indent))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Drop up to `indent` leading whitespace characters
fn strip_indent(line: &str, indent: usize) -> &str {
    let start = line
        .char_indices()
        .take(indent)
        .take_while(|(_, c)| c.is_whitespace())
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedent() {
        let text = "\n        Create a contract,\n          then deploy it.\n        ";
        assert_eq!(dedent(text), "Create a contract,\n  then deploy it.");
        assert_eq!(dedent("finished"), "finished");
    }

    #[test]
    fn test_dedent_wide_whitespace() {
        assert_eq!(dedent("  first\n\u{3000}second"), "first\nsecond");
        assert_eq!(dedent("\u{3000}\u{3000}a\n\u{3000}\u{3000}  b"), "a\n  b");
        assert_eq!(dedent("\n  top\n    deep\n  \n  shallow"), "top\n  deep\n\nshallow");
    }

    #[tokio::test]
    async fn test_operations_need_a_running_node() {
        let mut ctx = Scenario::new(Config::default()).unwrap();
        let err = ctx.new_master_account().await.unwrap_err();
        assert!(matches!(err, Error::NodeNotRunning));
        assert!(ctx.log().is_err());
        ctx.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_even_when_reset_fails() {
        let mut config = Config::default();
        config.node.path = PathBuf::from("/nonexistent/bin/nodeos");
        let dir = tempfile::tempdir().unwrap();

        let mut ran = false;
        let result = Scenario::run(config, &dir.path().join("t.log"), |_ctx| {
            ran = true;
            Box::pin(async { Ok::<(), Error>(()) })
        })
        .await;
        assert!(matches!(result, Err(Error::NodeReset(_))));
        assert!(!ran);
    }
}
