//! Balance and table queries against the node
//!
//! Reads always go to the node. Absent symbols, tables, and rows read as
//! zero or empty rather than failing.

use serde_json::Value;

use crate::accounts::AccountRegistry;
use crate::chain::{Asset, Name, Symbol, SymbolCode};
use crate::common::{Error, Result};
use crate::contract::Abi;
use crate::node::{
    AccountArguments, AccountInfo, CurrencyBalanceArguments, CurrencyStatsArguments, NodeClient,
    TableRowsArguments,
};

/// Rows requested per page when reading a whole table
const PAGE_LIMIT: usize = 1000;

/// Balance of `code` held by `account` on token contract `contract`
///
/// When the account holds none, the result is zero with the precision the
/// contract declared for the symbol (or 0 if the symbol was never created).
/// The registry's cached view is refreshed either way.
pub async fn get_balance(
    client: &mut NodeClient,
    registry: &mut AccountRegistry,
    contract: &Name,
    account: &Name,
    code: &SymbolCode,
) -> Result<Asset> {
    let balances = client
        .get_currency_balance(&CurrencyBalanceArguments {
            code: contract.clone(),
            account: account.clone(),
            symbol: code.to_string(),
        })
        .await?;

    let balance = match balances.first() {
        Some(raw) => raw.parse::<Asset>()?,
        None => {
            let stats = client
                .get_currency_stats(&CurrencyStatsArguments {
                    code: contract.clone(),
                    symbol: code.to_string(),
                })
                .await?;
            let precision = stats.map(|s| s.supply.symbol.precision).unwrap_or(0);
            Asset::zero(Symbol::new(precision, code.clone())?)
        }
    };

    if balance.symbol.code != *code {
        return Err(Error::NodeProtocol(format!(
            "asked for {} balance, node answered {}",
            code, balance
        )));
    }

    tracing::debug!(account = %account, balance = %balance, "Read balance");
    registry.cache_balance(account, balance.clone());
    Ok(balance)
}

/// All rows of `code`'s table `table` in `scope`
pub async fn read_table(
    client: &mut NodeClient,
    code: &Name,
    scope: &str,
    table: &Name,
) -> Result<Vec<Value>> {
    read_table_paged(client, code, scope, table, PAGE_LIMIT).await
}

/// All rows of a table, fetched `page_limit` rows at a time
pub async fn read_table_paged(
    client: &mut NodeClient,
    code: &Name,
    scope: &str,
    table: &Name,
    page_limit: usize,
) -> Result<Vec<Value>> {
    let mut rows = Vec::new();
    let mut lower_bound = None;

    loop {
        let page = client
            .get_table_rows(&TableRowsArguments {
                code: code.clone(),
                scope: scope.to_string(),
                table: table.clone(),
                limit: page_limit,
                lower_bound: lower_bound.take(),
            })
            .await?;
        rows.extend(page.rows);

        if !page.more {
            return Ok(rows);
        }
        match page.next_key {
            Some(key) => {
                tracing::trace!(code = %code, table = %table, next = %key, "Fetching next page");
                lower_bound = Some(key);
            }
            None => {
                return Err(Error::NodeProtocol(format!(
                    "{}::{} reported more rows without a next key",
                    code, table
                )))
            }
        }
    }
}

/// Permissions and code hash of `account` as the node records them
pub async fn account_info(client: &mut NodeClient, account: &Name) -> Result<AccountInfo> {
    client
        .get_account(&AccountArguments {
            account: account.clone(),
        })
        .await
}

/// The ABI deployed on `account`, or `None` if it holds no contract
pub async fn deployed_abi(client: &mut NodeClient, account: &Name) -> Result<Option<Abi>> {
    let response = client
        .get_abi(&AccountArguments {
            account: account.clone(),
        })
        .await?;
    response
        .abi
        .map(|value| serde_json::from_value(value).map_err(|e| Error::InvalidAbi(e.to_string())))
        .transpose()
}
