//! Mock chain node binary for integration testing
//!
//! Speaks the node protocol on stdio and keeps chain state as JSON under the
//! data directory, so a restart without a reset sees the same chain.
//! Signatures and weighted authorities are checked for real. Contract
//! behavior is emulated by the shape of the deployed ABI: token contracts
//! (`create`, `issue`, `transfer`), the burn pool (`setsympair`), and a
//! generic engine that only checks that the action is declared.
//!
//! Submitted transactions stay pending until they have been polled
//! `--block-lag` times, then go into the next block in submission order.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use chain_harness::accounts::AuthorityGraph;
use chain_harness::chain::{
    Action, Asset, Authority, Name, Permission, PublicKey, SignedTransaction, Symbol, ACTIVE,
    OWNER, SYSTEM_ACCOUNT,
};
use chain_harness::contract::Abi;
use chain_harness::node::codec;
use chain_harness::node::{
    AbiResponse, AccountArguments, AccountInfo, CurrencyBalanceArguments, CurrencyStats,
    CurrencyStatsArguments, InfoResponse, PushTransactionArguments, PushTransactionResponse,
    TableRows, TableRowsArguments, TransactionState, TransactionStatus, TransactionStatusArguments,
};

const STATE_FILE: &str = "state.json";
const MAX_MEMO_BYTES: usize = 256;
/// Burned tokens are moved here when the account exists
const BLACK_HOLE: &str = "oooo";

#[derive(Parser, Debug)]
#[command(name = "mock_node", about = "Mock chain node speaking the harness protocol")]
struct Args {
    /// Directory holding the chain state
    #[arg(long)]
    data_dir: PathBuf,

    /// Key installed on the system account at genesis
    #[arg(long)]
    genesis_key: PublicKey,

    /// Status polls a transaction waits before it is put in a block
    #[arg(long, default_value_t = 1)]
    block_lag: u32,
}

fn main() {
    let args = Args::parse();
    let mut node = match MockNode::open(args) {
        Ok(node) => node,
        Err(e) => {
            eprintln!("error  {}", e);
            std::process::exit(1);
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    loop {
        let raw = match codec::blocking::read_message(&mut reader) {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(e) => {
                eprintln!("error  {}", e);
                std::process::exit(2);
            }
        };
        let message: Value = match serde_json::from_str(&raw) {
            Ok(message) => message,
            Err(e) => {
                eprintln!("warn   dropping message that is not JSON: {}", e);
                continue;
            }
        };

        let (outgoing, exit) = node.process_message(&message);
        for msg in &outgoing {
            if let Err(e) = codec::blocking::write_message(&mut writer, &msg.to_string()) {
                eprintln!("error  {}", e);
                std::process::exit(2);
            }
        }
        if exit {
            break;
        }
    }
    eprintln!("info   node stopped");
}

// === Chain state ===

/// Rows by primary key, by scope, by table, by contract
type Tables = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    created_block: u64,
    permissions: Vec<Permission>,
    code_hash: Option<String>,
    abi: Option<Abi>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChainState {
    head_block: u64,
    global_sequence: u64,
    accounts: BTreeMap<Name, AccountRecord>,
    tables: Tables,
}

impl ChainState {
    fn genesis(key: PublicKey) -> Result<Self, String> {
        let system = Name::new(SYSTEM_ACCOUNT).map_err(|e| e.to_string())?;
        let mut state = ChainState {
            head_block: 1,
            ..Default::default()
        };
        state.accounts.insert(
            system,
            AccountRecord {
                created_block: 1,
                permissions: standard_permissions(Authority::from_key(key), Authority::from_key(key))?,
                code_hash: None,
                abi: None,
            },
        );
        Ok(state)
    }

    fn authority_graph(&self) -> AuthorityGraph {
        let mut graph = AuthorityGraph::new();
        for (name, record) in &self.accounts {
            for permission in &record.permissions {
                graph.insert(name, permission.clone());
            }
        }
        graph
    }

    fn row<T: DeserializeOwned>(&self, code: &Name, table: &str, scope: &str, key: &str) -> Option<T> {
        let value = self
            .tables
            .get(code.as_str())?
            .get(table)?
            .get(scope)?
            .get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    fn set_row<T: Serialize>(
        &mut self,
        code: &Name,
        table: &str,
        scope: &str,
        key: &str,
        row: &T,
    ) -> Result<(), String> {
        let value = serde_json::to_value(row).map_err(|e| e.to_string())?;
        self.tables
            .entry(code.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn rows(&self, code: &Name, table: &str, scope: &str) -> Vec<Value> {
        self.scope_rows(code, table, scope)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn scope_rows(&self, code: &Name, table: &str, scope: &str) -> Option<&BTreeMap<String, Value>> {
        self.tables
            .get(code.as_str())
            .and_then(|t| t.get(table))
            .and_then(|s| s.get(scope))
    }

    /// Up to `limit` rows in primary key order starting at `lower_bound`
    fn page(
        &self,
        code: &Name,
        table: &str,
        scope: &str,
        lower_bound: Option<&str>,
        limit: usize,
    ) -> TableRows {
        let Some(all) = self.scope_rows(code, table, scope) else {
            return TableRows::default();
        };
        let mut iter = all
            .iter()
            .filter(|(key, _)| lower_bound.map_or(true, |bound| key.as_str() >= bound));
        let rows = iter.by_ref().take(limit).map(|(_, row)| row.clone()).collect();
        let next_key = iter.next().map(|(key, _)| key.clone());
        TableRows {
            rows,
            more: next_key.is_some(),
            next_key,
        }
    }

    fn engine(&self, account: &Name) -> Option<Engine> {
        let record = self.accounts.get(account)?;
        record.code_hash.as_ref()?;
        record.abi.as_ref().map(Engine::detect)
    }
}

fn standard_permissions(owner: Authority, active: Authority) -> Result<Vec<Permission>, String> {
    let owner_name = Name::new(OWNER).map_err(|e| e.to_string())?;
    Ok(vec![
        Permission {
            name: owner_name.clone(),
            parent: None,
            authority: owner,
        },
        Permission {
            name: Name::new(ACTIVE).map_err(|e| e.to_string())?,
            parent: Some(owner_name),
            authority: active,
        },
    ])
}

// === Node ===

struct Pending {
    id: String,
    transaction: SignedTransaction,
    polls: u32,
}

struct MockNode {
    data_dir: PathBuf,
    chain_id: String,
    block_lag: u32,
    seq: i64,
    state: ChainState,
    pending: VecDeque<Pending>,
    statuses: HashMap<String, TransactionStatus>,
}

impl MockNode {
    fn open(args: Args) -> Result<Self, String> {
        std::fs::create_dir_all(&args.data_dir)
            .map_err(|e| format!("cannot create data dir: {}", e))?;

        let state_path = args.data_dir.join(STATE_FILE);
        let state = if state_path.exists() {
            let bytes = std::fs::read(&state_path)
                .map_err(|e| format!("cannot read {}: {}", state_path.display(), e))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| format!("corrupt state {}: {}", state_path.display(), e))?
        } else {
            ChainState::genesis(args.genesis_key)?
        };

        let chain_id = hex::encode(Sha256::digest(args.genesis_key.to_string().as_bytes()));
        eprintln!("info   node started, head block #{}", state.head_block);

        let node = Self {
            data_dir: args.data_dir,
            chain_id,
            block_lag: args.block_lag,
            seq: 1,
            state,
            pending: VecDeque::new(),
            statuses: HashMap::new(),
        };
        node.save();
        Ok(node)
    }

    fn save(&self) {
        let path = self.data_dir.join(STATE_FILE);
        match serde_json::to_vec_pretty(&self.state) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&path, bytes) {
                    eprintln!("error  cannot write {}: {}", path.display(), e);
                }
            }
            Err(e) => eprintln!("error  cannot encode state: {}", e),
        }
    }

    fn next_seq(&mut self) -> i64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Handle one message, returning outgoing messages and whether to exit
    fn process_message(&mut self, message: &Value) -> (Vec<Value>, bool) {
        let mut outgoing = Vec::new();
        if message.get("type").and_then(Value::as_str) != Some("request") {
            return (outgoing, false);
        }
        let Some(command) = message.get("command").and_then(Value::as_str) else {
            return (outgoing, false);
        };
        let request_seq = message.get("seq").and_then(Value::as_i64).unwrap_or(0);
        let arguments = message.get("arguments").cloned().unwrap_or(Value::Null);

        let mut exit = false;
        let result = match command {
            "info" => to_body(&InfoResponse {
                chain_id: self.chain_id.clone(),
                server_version: format!("mock-node/{}", env!("CARGO_PKG_VERSION")),
                head_block_num: self.state.head_block,
            }),
            "push_transaction" => self.push_transaction(arguments, &mut outgoing),
            "get_transaction_status" => self.transaction_status(arguments, &mut outgoing),
            "get_account" => self.get_account(arguments),
            "get_abi" => self.get_abi(arguments),
            "get_table_rows" => self.get_table_rows(arguments),
            "get_currency_balance" => self.get_currency_balance(arguments),
            "get_currency_stats" => self.get_currency_stats(arguments),
            "shutdown" => {
                exit = true;
                Ok(Value::Null)
            }
            other => Err(format!("unknown command '{}'", other)),
        };

        let seq = self.next_seq();
        let response = match result {
            Ok(body) => json!({
                "seq": seq,
                "type": "response",
                "request_seq": request_seq,
                "success": true,
                "command": command,
                "body": body,
            }),
            Err(message) => json!({
                "seq": seq,
                "type": "response",
                "request_seq": request_seq,
                "success": false,
                "command": command,
                "message": message,
            }),
        };
        outgoing.push(response);
        (outgoing, exit)
    }

    fn push_transaction(&mut self, arguments: Value, outgoing: &mut Vec<Value>) -> Result<Value, String> {
        let args: PushTransactionArguments = parse_arguments(arguments)?;
        let id = args.transaction.transaction.id().map_err(|e| e.to_string())?;
        if self.statuses.contains_key(&id) || self.pending.iter().any(|p| p.id == id) {
            return Err(format!("duplicate transaction {}", id));
        }

        self.pending.push_back(Pending {
            id: id.clone(),
            transaction: args.transaction,
            polls: 0,
        });
        if self.block_lag == 0 {
            self.produce_block(outgoing);
        }
        to_body(&PushTransactionResponse { transaction_id: id })
    }

    fn transaction_status(&mut self, arguments: Value, outgoing: &mut Vec<Value>) -> Result<Value, String> {
        let args: TransactionStatusArguments = parse_arguments(arguments)?;
        for pending in self.pending.iter_mut() {
            pending.polls += 1;
        }
        self.produce_block(outgoing);

        let status = match self.statuses.get(&args.id) {
            Some(status) => status.clone(),
            None => {
                let state = if self.pending.iter().any(|p| p.id == args.id) {
                    TransactionState::Pending
                } else {
                    TransactionState::Unknown
                };
                TransactionStatus {
                    id: args.id,
                    state,
                    block_num: None,
                    global_sequence: None,
                    error: None,
                    console: Vec::new(),
                }
            }
        };
        to_body(&status)
    }

    /// Put every transaction that waited long enough into a new block
    fn produce_block(&mut self, outgoing: &mut Vec<Value>) {
        let mut ready = Vec::new();
        while self
            .pending
            .front()
            .map(|p| p.polls >= self.block_lag)
            .unwrap_or(false)
        {
            if let Some(pending) = self.pending.pop_front() {
                ready.push(pending);
            }
        }
        if ready.is_empty() {
            return;
        }

        self.state.head_block += 1;
        let block_num = self.state.head_block;
        let count = ready.len();
        for pending in ready {
            let status = self.apply(pending.id.clone(), &pending.transaction, block_num);
            self.statuses.insert(pending.id, status);
        }
        self.save();

        eprintln!("info   produced block #{} with {} transactions", block_num, count);
        let seq = self.next_seq();
        outgoing.push(json!({
            "seq": seq,
            "type": "event",
            "event": "block",
            "body": { "block_num": block_num, "transactions": count },
        }));
    }

    /// Execute a transaction atomically against a copy of the state
    fn apply(&mut self, id: String, transaction: &SignedTransaction, block_num: u64) -> TransactionStatus {
        let mut working = self.state.clone();
        let mut console = Vec::new();
        match execute_transaction(&mut working, transaction, &mut console) {
            Ok(global_sequence) => {
                self.state = working;
                for line in &console {
                    eprintln!("info   [{}] {}", &id[..8], line);
                }
                TransactionStatus {
                    id,
                    state: TransactionState::Executed,
                    block_num: Some(block_num),
                    global_sequence: Some(global_sequence),
                    error: None,
                    console,
                }
            }
            Err(message) => {
                eprintln!("error  [{}] transaction failed: {}", &id[..8], message);
                TransactionStatus {
                    id,
                    state: TransactionState::Failed,
                    block_num: None,
                    global_sequence: None,
                    error: Some(message),
                    console: Vec::new(),
                }
            }
        }
    }

    fn get_account(&self, arguments: Value) -> Result<Value, String> {
        let args: AccountArguments = parse_arguments(arguments)?;
        let record = self
            .state
            .accounts
            .get(&args.account)
            .ok_or_else(|| format!("unknown account {}", args.account))?;
        to_body(&AccountInfo {
            account_name: args.account.clone(),
            created_block: record.created_block,
            permissions: record.permissions.clone(),
            code_hash: record.code_hash.clone(),
        })
    }

    fn get_abi(&self, arguments: Value) -> Result<Value, String> {
        let args: AccountArguments = parse_arguments(arguments)?;
        let record = self
            .state
            .accounts
            .get(&args.account)
            .ok_or_else(|| format!("unknown account {}", args.account))?;
        let abi = record
            .abi
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| e.to_string())?;
        to_body(&AbiResponse {
            account_name: args.account,
            abi,
        })
    }

    fn get_table_rows(&self, arguments: Value) -> Result<Value, String> {
        let args: TableRowsArguments = parse_arguments(arguments)?;
        if args.limit == 0 {
            return Err("limit must be positive".to_string());
        }
        let page = self.state.page(
            &args.code,
            args.table.as_str(),
            &args.scope,
            args.lower_bound.as_deref(),
            args.limit,
        );
        to_body(&page)
    }

    fn get_currency_balance(&self, arguments: Value) -> Result<Value, String> {
        let args: CurrencyBalanceArguments = parse_arguments(arguments)?;
        let balance: Option<BalanceRow> =
            self.state
                .row(&args.code, "accounts", args.account.as_str(), &args.symbol);
        let balances: Vec<String> = balance.map(|b| b.balance.to_string()).into_iter().collect();
        to_body(&balances)
    }

    fn get_currency_stats(&self, arguments: Value) -> Result<Value, String> {
        let args: CurrencyStatsArguments = parse_arguments(arguments)?;
        let stats: Option<CurrencyStats> = self.state.row(&args.code, "stat", &args.symbol, &args.symbol);
        to_body(&stats)
    }
}

fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, String> {
    serde_json::from_value(arguments).map_err(|e| format!("invalid arguments: {}", e))
}

fn to_body<T: Serialize>(body: &T) -> Result<Value, String> {
    serde_json::to_value(body).map_err(|e| e.to_string())
}

// === Execution ===

/// Check signatures and authorities, then run every action in order
///
/// Returns the global sequence of the first action.
fn execute_transaction(
    state: &mut ChainState,
    signed: &SignedTransaction,
    console: &mut Vec<String>,
) -> Result<u64, String> {
    let verified = signed.verified_keys().map_err(|e| e.to_string())?;
    if verified.len() != signed.signatures.len() {
        return Err("transaction carries a signature that does not verify".to_string());
    }
    let keys: HashSet<PublicKey> = verified.into_iter().collect();

    let actions = &signed.transaction.actions;
    if actions.is_empty() {
        return Err("transaction must have at least one action".to_string());
    }

    let graph = state.authority_graph();
    for action in actions {
        if action.authorization.is_empty() {
            return Err(format!("action {} declares no authorization", action.label()));
        }
        for level in &action.authorization {
            if !state.accounts.contains_key(&level.actor) {
                return Err(format!("authorizing account '{}' does not exist", level.actor));
            }
            if !graph.satisfied_by_keys(level, &keys) {
                return Err(format!(
                    "transaction declares authority '{}', but does not have signatures for it",
                    level
                ));
            }
        }
    }

    let mut first = None;
    for action in actions {
        state.global_sequence += 1;
        first.get_or_insert(state.global_sequence);
        dispatch(state, action, console)?;
    }
    first.ok_or_else(|| "transaction must have at least one action".to_string())
}

fn dispatch(state: &mut ChainState, action: &Action, console: &mut Vec<String>) -> Result<(), String> {
    if action.account == SYSTEM_ACCOUNT {
        return apply_system(state, action, console);
    }

    let record = state
        .accounts
        .get(&action.account)
        .ok_or_else(|| format!("account {} does not exist", action.account))?;
    let abi = match (&record.code_hash, &record.abi) {
        (Some(_), Some(abi)) => abi,
        _ => return Err(format!("account {} has no contract deployed", action.account)),
    };
    if !abi.has_action(action.name.as_str()) {
        return Err(format!(
            "action '{}' is not declared by the ABI of {}",
            action.name, action.account
        ));
    }

    match Engine::detect(abi) {
        Engine::Token => apply_token(state, action, console),
        Engine::BurnPool => apply_burnpool(state, action, console),
        Engine::Generic => {
            console.push(format!("{} executed", action.label()));
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Engine {
    Token,
    BurnPool,
    Generic,
}

impl Engine {
    fn detect(abi: &Abi) -> Self {
        if abi.has_action("setsympair") {
            Engine::BurnPool
        } else if ["create", "issue", "transfer"].iter().all(|a| abi.has_action(a)) {
            Engine::Token
        } else {
            Engine::Generic
        }
    }
}

fn action_args<T: DeserializeOwned>(action: &Action) -> Result<T, String> {
    serde_json::from_value(action.data.clone())
        .map_err(|e| format!("cannot decode {} data: {}", action.label(), e))
}

fn require_auth(action: &Action, account: &Name) -> Result<(), String> {
    if action.authorization.iter().any(|level| &level.actor == account) {
        Ok(())
    } else {
        Err(format!("missing authority of {}", account))
    }
}

fn check(condition: bool, message: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(format!("assertion failure with message: {}", message))
    }
}

// --- System actions ---

#[derive(Deserialize)]
struct NewAccountArgs {
    creator: Name,
    name: Name,
    owner: Authority,
    active: Authority,
}

#[derive(Deserialize)]
struct UpdateAuthArgs {
    account: Name,
    permission: Name,
    #[serde(default)]
    parent: String,
    auth: Authority,
}

#[derive(Deserialize)]
struct SetCodeArgs {
    account: Name,
    code: String,
}

#[derive(Deserialize)]
struct SetAbiArgs {
    account: Name,
    abi: Value,
}

fn apply_system(state: &mut ChainState, action: &Action, console: &mut Vec<String>) -> Result<(), String> {
    match action.name.as_str() {
        "newaccount" => {
            let args: NewAccountArgs = action_args(action)?;
            require_auth(action, &args.creator)?;
            if state.accounts.contains_key(&args.name) {
                return Err(format!(
                    "Cannot create account named {}, as that name is already taken",
                    args.name
                ));
            }
            check(args.owner.is_valid(), "invalid owner authority")?;
            check(args.active.is_valid(), "invalid active authority")?;
            state.accounts.insert(
                args.name.clone(),
                AccountRecord {
                    created_block: state.head_block,
                    permissions: standard_permissions(args.owner, args.active)?,
                    code_hash: None,
                    abi: None,
                },
            );
            console.push(format!("created account {} by {}", args.name, args.creator));
            Ok(())
        }
        "updateauth" => {
            let args: UpdateAuthArgs = action_args(action)?;
            require_auth(action, &args.account)?;
            let record = state
                .accounts
                .get_mut(&args.account)
                .ok_or_else(|| format!("account {} does not exist", args.account))?;

            let parent = if args.permission == OWNER {
                check(args.parent.is_empty(), "owner permission cannot have a parent")?;
                None
            } else {
                check(!args.parent.is_empty(), "only owner may omit the parent")?;
                check(args.parent != args.permission.as_str(), "permission cannot be its own parent")?;
                let parent = Name::new(&args.parent).map_err(|e| e.to_string())?;
                if !record.permissions.iter().any(|p| p.name == parent) {
                    return Err(format!("parent permission {} does not exist", parent));
                }
                Some(parent)
            };
            check(args.auth.is_valid(), "invalid authority")?;

            let permission = Permission {
                name: args.permission.clone(),
                parent,
                authority: args.auth,
            };
            match record.permissions.iter_mut().find(|p| p.name == args.permission) {
                Some(existing) => *existing = permission,
                None => record.permissions.push(permission),
            }
            console.push(format!("updated {}@{}", args.account, args.permission));
            Ok(())
        }
        "setcode" => {
            let args: SetCodeArgs = action_args(action)?;
            require_auth(action, &args.account)?;
            let code = hex::decode(&args.code).map_err(|e| format!("code is not valid hex: {}", e))?;
            check(!code.is_empty(), "code is empty")?;
            let record = state
                .accounts
                .get_mut(&args.account)
                .ok_or_else(|| format!("account {} does not exist", args.account))?;
            let hash = hex::encode(Sha256::digest(&code));
            console.push(format!("set code of {} to {}", args.account, &hash[..12]));
            record.code_hash = Some(hash);
            Ok(())
        }
        "setabi" => {
            let args: SetAbiArgs = action_args(action)?;
            require_auth(action, &args.account)?;
            let abi: Abi = serde_json::from_value(args.abi).map_err(|e| format!("abi is invalid: {}", e))?;
            abi.validate().map_err(|e| format!("abi is invalid: {}", e))?;
            let record = state
                .accounts
                .get_mut(&args.account)
                .ok_or_else(|| format!("account {} does not exist", args.account))?;
            record.abi = Some(abi);
            console.push(format!("set abi of {}", args.account));
            Ok(())
        }
        other => Err(format!("unknown system action '{}'", other)),
    }
}

// --- Token contracts ---

#[derive(Deserialize)]
struct CreateArgs {
    issuer: Name,
    maximum_supply: Asset,
}

#[derive(Deserialize)]
struct IssueArgs {
    to: Name,
    quantity: Asset,
    memo: String,
}

#[derive(Deserialize)]
struct RetireArgs {
    quantity: Asset,
    memo: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TransferArgs {
    from: Name,
    to: Name,
    quantity: Asset,
    memo: String,
}

#[derive(Serialize, Deserialize)]
struct BalanceRow {
    balance: Asset,
}

fn apply_token(state: &mut ChainState, action: &Action, console: &mut Vec<String>) -> Result<(), String> {
    let contract = &action.account;
    match action.name.as_str() {
        "create" => {
            let args: CreateArgs = action_args(action)?;
            require_auth(action, contract)?;
            check(args.maximum_supply.amount > 0, "max-supply must be positive")?;
            let code = args.maximum_supply.symbol.code.to_string();
            let existing: Option<CurrencyStats> = state.row(contract, "stat", &code, &code);
            check(existing.is_none(), "token with symbol already exists")?;

            let stats = CurrencyStats {
                supply: Asset::zero(args.maximum_supply.symbol.clone()),
                max_supply: args.maximum_supply.clone(),
                issuer: args.issuer.clone(),
            };
            state.set_row(contract, "stat", &code, &code, &stats)?;
            console.push(format!("created {} issued by {}", args.maximum_supply, args.issuer));
            Ok(())
        }
        "issue" => {
            let args: IssueArgs = action_args(action)?;
            check(args.memo.len() <= MAX_MEMO_BYTES, "memo has more than 256 bytes")?;
            let code = args.quantity.symbol.code.to_string();
            let mut stats: CurrencyStats = state
                .row(contract, "stat", &code, &code)
                .ok_or_else(|| {
                    "assertion failure with message: token with symbol does not exist, create token before issue"
                        .to_string()
                })?;
            check(args.to == stats.issuer, "tokens can only be issued to issuer account")?;
            require_auth(action, &stats.issuer)?;
            check(args.quantity.amount > 0, "must issue positive quantity")?;
            check(args.quantity.symbol == stats.supply.symbol, "symbol precision mismatch")?;
            check(
                args.quantity.amount <= stats.max_supply.amount - stats.supply.amount,
                "quantity exceeds available supply",
            )?;

            stats.supply.amount += args.quantity.amount;
            state.set_row(contract, "stat", &code, &code, &stats)?;
            add_balance(state, contract, &stats.issuer, &args.quantity)?;
            console.push(format!("issued {} to {}", args.quantity, stats.issuer));
            Ok(())
        }
        "retire" => {
            let args: RetireArgs = action_args(action)?;
            check(args.memo.len() <= MAX_MEMO_BYTES, "memo has more than 256 bytes")?;
            let code = args.quantity.symbol.code.to_string();
            let mut stats: CurrencyStats = state
                .row(contract, "stat", &code, &code)
                .ok_or_else(|| "assertion failure with message: token with symbol does not exist".to_string())?;
            require_auth(action, &stats.issuer)?;
            check(args.quantity.amount > 0, "must retire positive quantity")?;
            check(args.quantity.symbol == stats.supply.symbol, "symbol precision mismatch")?;

            sub_balance(state, contract, &stats.issuer, &args.quantity)?;
            stats.supply.amount -= args.quantity.amount;
            state.set_row(contract, "stat", &code, &code, &stats)?;
            console.push(format!("retired {} from {}", args.quantity, stats.issuer));
            Ok(())
        }
        "transfer" => {
            let args: TransferArgs = action_args(action)?;
            check(args.from != args.to, "cannot transfer to self")?;
            require_auth(action, &args.from)?;
            check(state.accounts.contains_key(&args.to), "to account does not exist")?;
            let code = args.quantity.symbol.code.to_string();
            let stats: CurrencyStats = state
                .row(contract, "stat", &code, &code)
                .ok_or_else(|| "assertion failure with message: token with symbol does not exist".to_string())?;
            check(args.quantity.amount > 0, "must transfer positive quantity")?;
            check(args.quantity.symbol == stats.supply.symbol, "symbol precision mismatch")?;
            check(args.memo.len() <= MAX_MEMO_BYTES, "memo has more than 256 bytes")?;

            sub_balance(state, contract, &args.from, &args.quantity)?;
            add_balance(state, contract, &args.to, &args.quantity)?;
            console.push(format!(
                "transfer {} from {} to {} memo '{}'",
                args.quantity, args.from, args.to, args.memo
            ));

            if state.engine(&args.to) == Some(Engine::BurnPool) {
                let pool = args.to.clone();
                on_pool_transfer(state, &pool, contract, &args, console)?;
            }
            Ok(())
        }
        other => {
            console.push(format!("{}::{} executed", contract, other));
            Ok(())
        }
    }
}

fn add_balance(state: &mut ChainState, contract: &Name, owner: &Name, value: &Asset) -> Result<(), String> {
    let code = value.symbol.code.to_string();
    let balance = match state.row::<BalanceRow>(contract, "accounts", owner.as_str(), &code) {
        Some(row) => row
            .balance
            .checked_add(value)
            .ok_or_else(|| "assertion failure with message: balance overflow".to_string())?,
        None => value.clone(),
    };
    state.set_row(contract, "accounts", owner.as_str(), &code, &BalanceRow { balance })
}

fn sub_balance(state: &mut ChainState, contract: &Name, owner: &Name, value: &Asset) -> Result<(), String> {
    let code = value.symbol.code.to_string();
    let row: BalanceRow = state
        .row(contract, "accounts", owner.as_str(), &code)
        .ok_or_else(|| "assertion failure with message: no balance object found".to_string())?;
    check(row.balance.amount >= value.amount, "overdrawn balance")?;
    let balance = row
        .balance
        .checked_sub(value)
        .ok_or_else(|| "assertion failure with message: symbol precision mismatch".to_string())?;
    state.set_row(contract, "accounts", owner.as_str(), &code, &BalanceRow { balance })
}

// --- Burn pool ---

#[derive(Deserialize)]
struct SetSymPairArgs {
    token_symbol: Symbol,
    token_bank: Name,
    base_fgt_amount: Asset,
}

#[derive(Deserialize)]
struct OpenSymPairArgs {
    sympair_code: Name,
    on_off: bool,
}

#[derive(Serialize, Deserialize)]
struct SymPairRow {
    code: Name,
    token_symbol: Symbol,
    token_bank: Name,
    base_fgt_amount: Asset,
    /// Paired token deposited so far
    token_quant: Asset,
    burn_count: u64,
    enabled: bool,
}

#[derive(Serialize, Deserialize)]
struct BurnRow {
    id: u64,
    from: Name,
    quantity: Asset,
    sympair: Name,
    bank: Name,
}

const SYMPAIR_TABLE: &str = "sympairs";
const BURN_TABLE: &str = "burns";

fn sympair_code(symbol: &Symbol) -> Result<Name, String> {
    Name::new(&symbol.code.as_str().to_lowercase()).map_err(|e| e.to_string())
}

fn apply_burnpool(state: &mut ChainState, action: &Action, console: &mut Vec<String>) -> Result<(), String> {
    let pool = &action.account;
    let scope = pool.to_string();
    match action.name.as_str() {
        "setsympair" => {
            let args: SetSymPairArgs = action_args(action)?;
            require_auth(action, pool)?;
            check(args.base_fgt_amount.amount > 0, "base_fgt_amount must be positive")?;
            check(
                state.engine(&args.token_bank) == Some(Engine::Token),
                &format!("token bank {} has no token contract", args.token_bank),
            )?;
            let code = args.token_symbol.code.to_string();
            let stats: CurrencyStats = state
                .row(&args.token_bank, "stat", &code, &code)
                .ok_or_else(|| {
                    format!(
                        "assertion failure with message: symbol {} not found in bank {}",
                        args.token_symbol, args.token_bank
                    )
                })?;
            check(stats.supply.symbol == args.token_symbol, "symbol precision mismatch")?;

            let key = sympair_code(&args.token_symbol)?;
            let existing: Option<SymPairRow> = state.row(pool, SYMPAIR_TABLE, &scope, key.as_str());
            check(existing.is_none(), "token symbol is existed")?;

            let row = SymPairRow {
                code: key.clone(),
                token_symbol: args.token_symbol.clone(),
                token_bank: args.token_bank,
                base_fgt_amount: args.base_fgt_amount,
                token_quant: Asset::zero(args.token_symbol),
                burn_count: 0,
                enabled: true,
            };
            state.set_row(pool, SYMPAIR_TABLE, &scope, key.as_str(), &row)?;
            console.push(format!("sympair {} registered", key));
            Ok(())
        }
        "opensympair" => {
            let args: OpenSymPairArgs = action_args(action)?;
            require_auth(action, pool)?;
            let mut row: SymPairRow = state
                .row(pool, SYMPAIR_TABLE, &scope, args.sympair_code.as_str())
                .ok_or_else(|| {
                    format!(
                        "assertion failure with message: sympair not found: {}",
                        args.sympair_code
                    )
                })?;
            row.enabled = args.on_off;
            state.set_row(pool, SYMPAIR_TABLE, &scope, args.sympair_code.as_str(), &row)?;
            console.push(format!("sympair {} enabled={}", args.sympair_code, args.on_off));
            Ok(())
        }
        other => {
            console.push(format!("{}::{} executed", pool, other));
            Ok(())
        }
    }
}

/// Transfer notification received by the pool from token contract `bank`
///
/// A memo naming a symbol burns the quantity against that pair; anything
/// else is a deposit of the paired token.
fn on_pool_transfer(
    state: &mut ChainState,
    pool: &Name,
    bank: &Name,
    args: &TransferArgs,
    console: &mut Vec<String>,
) -> Result<(), String> {
    if &args.from == pool {
        return Ok(());
    }
    check(&args.to == pool, "Must transfer to this contract")?;
    check(args.quantity.amount > 0, "The quantity must be positive")?;
    let scope = pool.to_string();

    match args.memo.trim().parse::<Symbol>() {
        Ok(target) => {
            let key = sympair_code(&target)?;
            let mut pair: SymPairRow = state
                .row(pool, SYMPAIR_TABLE, &scope, key.as_str())
                .ok_or_else(|| format!("assertion failure with message: sympair not found: {}", key))?;
            check(pair.token_symbol == target, "symbol precision mismatch")?;
            check(pair.enabled, &format!("sympair is disabled: {}", key))?;

            let id = state.rows(pool, BURN_TABLE, &scope).len() as u64 + 1;
            let burn = BurnRow {
                id,
                from: args.from.clone(),
                quantity: args.quantity.clone(),
                sympair: key.clone(),
                bank: bank.clone(),
            };
            state.set_row(pool, BURN_TABLE, &scope, &format!("{:020}", id), &burn)?;
            pair.burn_count += 1;
            state.set_row(pool, SYMPAIR_TABLE, &scope, key.as_str(), &pair)?;

            let black_hole = Name::new(BLACK_HOLE).map_err(|e| e.to_string())?;
            if state.accounts.contains_key(&black_hole) {
                sub_balance(state, bank, pool, &args.quantity)?;
                add_balance(state, bank, &black_hole, &args.quantity)?;
            }
            console.push(format!(
                "burn {} from {} against {}",
                args.quantity, args.from, target
            ));
            Ok(())
        }
        Err(_) => {
            let key = sympair_code(&args.quantity.symbol)?;
            let mut pair: SymPairRow = state
                .row(pool, SYMPAIR_TABLE, &scope, key.as_str())
                .ok_or_else(|| format!("assertion failure with message: sympair not found: {}", key))?;
            check(bank == &pair.token_bank, &format!("invalid token bank: {}", bank))?;
            pair.token_quant = pair
                .token_quant
                .checked_add(&args.quantity)
                .ok_or_else(|| "assertion failure with message: symbol precision mismatch".to_string())?;
            state.set_row(pool, SYMPAIR_TABLE, &scope, key.as_str(), &pair)?;
            console.push(format!(
                "deposit {} from {} into {}, pool holds {}",
                args.quantity, args.from, key, pair.token_quant
            ));
            Ok(())
        }
    }
}
