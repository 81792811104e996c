//! Build once, deploy anywhere
//!
//! The pipeline caches artifacts by source path, so repeated setups of the
//! same contract within a run compile it only once. Deploying pushes
//! `setcode` and `setabi` in a single transaction authorized by the target.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::accounts::AccountRegistry;
use crate::chain::{Action, Name, PermissionLevel, SYSTEM_ACCOUNT};
use crate::common::{Error, Result};
use crate::node::NodeClient;
use crate::tx::{Invocation, TransactionExecutor};

use super::abi::Abi;
use super::builder::{Artifact, Builder};

pub struct ContractPipeline {
    builder: Box<dyn Builder>,
    cache: HashMap<PathBuf, Artifact>,
}

impl ContractPipeline {
    pub fn new(builder: Box<dyn Builder>) -> Self {
        Self {
            builder,
            cache: HashMap::new(),
        }
    }

    /// Build `source`, reusing a cached artifact when one exists
    #[tracing::instrument(skip(self), fields(source = %source.display()))]
    pub async fn build(&mut self, source: &Path) -> Result<BuildResult> {
        let key = source
            .canonicalize()
            .map_err(|e| Error::build(source, e.to_string()))?;

        if let Some(artifact) = self.cache.get(&key) {
            tracing::debug!(contract = %artifact.name, "Using cached artifact");
            return Ok(BuildResult {
                artifact: artifact.clone(),
            });
        }

        let artifact = self.builder.build(source).await?;
        tracing::info!(
            contract = %artifact.name,
            code_hash = %artifact.code_hash,
            "Built contract"
        );
        self.cache.insert(key, artifact.clone());
        Ok(BuildResult { artifact })
    }

    /// Number of cached artifacts
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// A built artifact ready to deploy
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub artifact: Artifact,
}

impl BuildResult {
    pub fn name(&self) -> &str {
        &self.artifact.name
    }

    /// The `setcode` and `setabi` actions installing this artifact on `target`
    pub fn deploy_actions(&self, target: &Name) -> Result<(Abi, Vec<Action>)> {
        let abi = Abi::parse(&self.artifact.abi)
            .map_err(|e| Error::deploy(target.as_str(), e.to_string()))?;
        let abi_value: Value = serde_json::to_value(&abi)?;

        let system = Name::from_static(SYSTEM_ACCOUNT);
        let authorization = vec![PermissionLevel::active(target)];
        let actions = vec![
            Action {
                account: system.clone(),
                name: Name::from_static("setcode"),
                authorization: authorization.clone(),
                data: json!({
                    "account": target,
                    "vmtype": 0,
                    "vmversion": 0,
                    "code": hex::encode(&self.artifact.code),
                }),
            },
            Action {
                account: system,
                name: Name::from_static("setabi"),
                authorization,
                data: json!({
                    "account": target,
                    "abi": abi_value,
                }),
            },
        ];
        Ok((abi, actions))
    }

    /// Deploy to `target`, replacing whatever contract it held
    #[tracing::instrument(skip_all, fields(contract = %self.artifact.name, target = %target))]
    pub async fn deploy(
        &self,
        executor: &mut TransactionExecutor,
        client: &mut NodeClient,
        registry: &AccountRegistry,
        target: &Name,
    ) -> Result<ContractHandle> {
        registry
            .get(target)
            .map_err(|e| Error::deploy(target.as_str(), e.to_string()))?;

        let (abi, actions) = self.deploy_actions(target)?;
        executor
            .execute(client, registry, actions)
            .await
            .map_err(|e| match e {
                Error::Transaction { message, .. } => Error::deploy(target.as_str(), message),
                other => other,
            })?;

        tracing::info!("Deployed contract");
        Ok(ContractHandle {
            account: target.clone(),
            abi,
            code_hash: self.artifact.code_hash.clone(),
        })
    }
}

/// An account bound to deployed code
#[derive(Debug, Clone)]
pub struct ContractHandle {
    pub account: Name,
    pub abi: Abi,
    pub code_hash: String,
}

impl ContractHandle {
    /// An invocation of one of this contract's actions
    pub fn invocation(
        &self,
        action: &str,
        data: Value,
        authorizers: &[PermissionLevel],
    ) -> Result<Invocation> {
        let declared = self.abi.action(action).ok_or_else(|| Error::UnknownAction {
            contract: self.account.to_string(),
            action: action.to_string(),
        })?;
        Ok(Invocation::new(
            self.account.clone(),
            declared.name.clone(),
            data,
            authorizers.to_vec(),
        ))
    }

    pub fn actions(&self) -> impl Iterator<Item = &Name> {
        self.abi.action_names()
    }

    /// `account@active`
    pub fn active(&self) -> PermissionLevel {
        PermissionLevel::active(&self.account)
    }
}
