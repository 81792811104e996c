//! Submit-then-poll transaction execution
//!
//! Every invocation is signed with the wallet keys covering its declared
//! authorizers, pushed to the node, and polled until the node reports it
//! executed or failed. Only one transaction is ever in flight, so confirmed
//! order always equals issuance order.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::accounts::AccountRegistry;
use crate::chain::{Action, Asset, Name, PermissionLevel, Transaction};
use crate::common::config::Timeouts;
use crate::common::{Error, Result};
use crate::node::{NodeClient, PushTransactionArguments, TransactionState};

use super::router::TokenRouter;

/// A contract call with its declared authorizers
#[derive(Debug, Clone)]
pub struct Invocation {
    pub contract: Name,
    pub action: Name,
    pub data: Value,
    /// Passed to the node unmodified and in this order
    pub authorizers: Vec<PermissionLevel>,
}

impl Invocation {
    pub fn new(contract: Name, action: Name, data: Value, authorizers: Vec<PermissionLevel>) -> Self {
        Self {
            contract,
            action,
            data,
            authorizers,
        }
    }

    pub fn into_action(self) -> Action {
        Action {
            account: self.contract,
            name: self.action,
            authorization: self.authorizers,
            data: self.data,
        }
    }
}

/// Outcome of an included transaction
#[derive(Debug, Clone)]
pub struct Receipt {
    pub id: String,
    /// `contract::action` of each action, in order
    pub actions: Vec<String>,
    pub block_num: u64,
    pub global_sequence: u64,
    /// Contract console output
    pub console: Vec<String>,
}

#[derive(Debug)]
pub struct TransactionExecutor {
    inclusion_timeout: Duration,
    poll_interval: Duration,
    nonce: u64,
    router: TokenRouter,
    history: Vec<Receipt>,
}

impl TransactionExecutor {
    pub fn new(timeouts: &Timeouts, default_token_contract: Name) -> Self {
        Self {
            inclusion_timeout: timeouts.inclusion(),
            poll_interval: timeouts.poll_interval(),
            nonce: 0,
            router: TokenRouter::new(default_token_contract),
            history: Vec::new(),
        }
    }

    /// Forget routes and history from the previous chain
    pub fn reset(&mut self) {
        self.router.clear();
        self.history.clear();
    }

    pub fn router(&self) -> &TokenRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut TokenRouter {
        &mut self.router
    }

    /// Receipts of every confirmed transaction since the last reset, in order
    pub fn history(&self) -> &[Receipt] {
        &self.history
    }

    /// Submit a single invocation and wait for it
    pub async fn invoke(
        &mut self,
        client: &mut NodeClient,
        registry: &AccountRegistry,
        invocation: Invocation,
    ) -> Result<Receipt> {
        self.execute(client, registry, vec![invocation.into_action()])
            .await
    }

    /// Call `action` on `contract` with the given authorizers
    pub async fn push_action(
        &mut self,
        client: &mut NodeClient,
        registry: &AccountRegistry,
        contract: &Name,
        action: &str,
        data: Value,
        authorizers: &[PermissionLevel],
    ) -> Result<Receipt> {
        let invocation = Invocation::new(
            contract.clone(),
            Name::new(action)?,
            data,
            authorizers.to_vec(),
        );
        self.invoke(client, registry, invocation).await
    }

    /// Move `quantity` from `from` to `to` on the contract that owns its symbol
    pub async fn transfer(
        &mut self,
        client: &mut NodeClient,
        registry: &AccountRegistry,
        from: &Name,
        to: &Name,
        quantity: &Asset,
        memo: &str,
    ) -> Result<Receipt> {
        let contract = self.router.route(&quantity.symbol.code).clone();
        let data = json!({
            "from": from,
            "to": to,
            "quantity": quantity,
            "memo": memo,
        });
        let authorizers = [PermissionLevel::active(from)];
        self.push_action(client, registry, &contract, "transfer", data, &authorizers)
            .await
    }

    /// Submit several actions as one atomic transaction and wait for it
    #[tracing::instrument(skip_all, fields(actions = actions.len()))]
    pub async fn execute(
        &mut self,
        client: &mut NodeClient,
        registry: &AccountRegistry,
        actions: Vec<Action>,
    ) -> Result<Receipt> {
        let labels: Vec<String> = actions.iter().map(Action::label).collect();
        let label = labels.join(", ");

        let authorizers: Vec<PermissionLevel> = actions
            .iter()
            .flat_map(|a| a.authorization.iter().cloned())
            .collect();
        let keys = registry.signing_keys(&authorizers);
        if keys.is_empty() {
            tracing::warn!("No wallet keys cover the declared authorizers");
        }

        self.nonce += 1;
        let transaction = Transaction {
            nonce: self.nonce,
            actions,
        }
        .sign(&keys)?;

        let id = client
            .push_transaction(&PushTransactionArguments { transaction })
            .await?;
        tracing::debug!(id = %id, "Transaction submitted");

        let receipt = self.await_inclusion(client, &id, &label).await?;
        let receipt = Receipt {
            actions: labels,
            ..receipt
        };

        tracing::info!(
            id = %receipt.id,
            block = receipt.block_num,
            "Executed {}",
            label
        );
        for line in &receipt.console {
            tracing::debug!(target: "chain_harness::console", "{}", line);
        }

        self.history.push(receipt.clone());
        Ok(receipt)
    }

    async fn await_inclusion(
        &self,
        client: &mut NodeClient,
        id: &str,
        label: &str,
    ) -> Result<Receipt> {
        let started = Instant::now();
        loop {
            let status = client.transaction_status(id).await?;
            match status.state {
                TransactionState::Executed => {
                    return Ok(Receipt {
                        id: status.id,
                        actions: Vec::new(),
                        block_num: status.block_num.unwrap_or_default(),
                        global_sequence: status.global_sequence.unwrap_or_default(),
                        console: status.console,
                    });
                }
                TransactionState::Failed => {
                    let message = status
                        .error
                        .unwrap_or_else(|| "transaction failed without a diagnostic".to_string());
                    tracing::info!(id = %id, "Rejected {}: {}", label, message);
                    return Err(Error::transaction(label, &message));
                }
                TransactionState::Pending | TransactionState::Unknown => {
                    if started.elapsed() >= self.inclusion_timeout {
                        return Err(Error::InclusionTimeout {
                            id: id.to_string(),
                            secs: self.inclusion_timeout.as_secs(),
                        });
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}
