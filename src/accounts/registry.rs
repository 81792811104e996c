//! Account registry and wallet
//!
//! Tracks every account created through the harness, the key pair that owns
//! it, and its permissions. Creation is two-phase: a plan is built here, the
//! `newaccount` action is pushed by the caller, and the plan is committed once
//! the node accepts it. The node stays the source of truth; the registry only
//! mirrors what the node confirmed.

use std::collections::{BTreeMap, HashMap};

use serde_json::json;

use crate::chain::name::counter_name;
use crate::chain::{
    Action, Asset, Authority, KeyPair, Name, Permission, PermissionLevel, PublicKey, SymbolCode,
    ACTIVE, OWNER, SYSTEM_ACCOUNT,
};
use crate::common::config::Defaults;
use crate::common::{Error, Result};

use super::graph::{AuthorityGraph, AuthorityMember};

/// An account known to the harness
#[derive(Debug, Clone)]
pub struct Account {
    pub name: Name,
    /// Creating account; `None` for master and system accounts
    pub parent: Option<Name>,
    /// Key generated for this account
    pub public_key: PublicKey,
    /// Permissions in installation order, `owner` and `active` first
    pub permissions: Vec<Permission>,
    /// Last balances read from the node; not authoritative
    pub balances: BTreeMap<SymbolCode, Asset>,
}

impl Account {
    /// `name@active`
    pub fn active(&self) -> PermissionLevel {
        PermissionLevel::active(&self.name)
    }

    /// `name@owner`
    pub fn owner(&self) -> PermissionLevel {
        PermissionLevel::owner(&self.name)
    }

    pub fn permission(&self, name: &str) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.name == name)
    }

    /// Cached balance for a symbol, if one was ever read
    pub fn cached_balance(&self, code: &SymbolCode) -> Option<&Asset> {
        self.balances.get(code)
    }
}

/// A pending account creation
#[derive(Debug)]
pub struct AccountPlan {
    pub name: Name,
    /// Account paying for and authorizing the creation
    pub creator: Name,
    pub parent: Option<Name>,
    pub key: KeyPair,
    pub owner: Authority,
    pub active: Authority,
}

impl AccountPlan {
    /// The `eosio::newaccount` action creating this account
    pub fn action(&self) -> Action {
        Action {
            account: Name::from_static(SYSTEM_ACCOUNT),
            name: Name::from_static("newaccount"),
            authorization: vec![PermissionLevel::active(&self.creator)],
            data: json!({
                "creator": self.creator,
                "name": self.name,
                "owner": self.owner,
                "active": self.active,
            }),
        }
    }
}

/// Registry of harness accounts, their keys, and the authority graph
#[derive(Debug)]
pub struct AccountRegistry {
    defaults: Defaults,
    accounts: BTreeMap<Name, Account>,
    wallet: HashMap<PublicKey, KeyPair>,
    graph: AuthorityGraph,
    /// Monotonic within one reset cycle
    factory_counter: u64,
}

impl AccountRegistry {
    pub fn new(defaults: Defaults) -> Self {
        Self {
            defaults,
            accounts: BTreeMap::new(),
            wallet: HashMap::new(),
            graph: AuthorityGraph::new(),
            factory_counter: 0,
        }
    }

    /// Forget everything and register the genesis system account
    pub fn reset(&mut self, system_key: &KeyPair) {
        self.accounts.clear();
        self.wallet.clear();
        self.graph.clear();
        self.factory_counter = 0;

        let system = Name::from_static(SYSTEM_ACCOUNT);
        let authority = Authority::from_key(system_key.public());
        let permissions = standard_permissions(authority.clone(), authority);
        for permission in &permissions {
            self.graph.insert(&system, permission.clone());
        }
        self.wallet.insert(system_key.public(), system_key.clone());
        self.accounts.insert(
            system.clone(),
            Account {
                name: system,
                parent: None,
                public_key: system_key.public(),
                permissions,
                balances: BTreeMap::new(),
            },
        );
    }

    /// Plan a root account created by the system account
    ///
    /// The first master of a reset cycle takes the configured master name;
    /// later ones get a counter suffix on it.
    pub fn plan_master_account(&mut self) -> Result<AccountPlan> {
        let preferred = Name::new(&self.defaults.master_name)?;
        let name = if self.accounts.contains_key(&preferred) {
            let prefix = self.defaults.master_name.clone();
            self.next_free_name(&prefix)?
        } else {
            preferred
        };

        let key = KeyPair::generate();
        let authority = Authority::from_key(key.public());
        Ok(AccountPlan {
            name,
            creator: Name::from_static(SYSTEM_ACCOUNT),
            parent: None,
            key,
            owner: authority.clone(),
            active: authority,
        })
    }

    /// Plan a child of `parent`, named explicitly or from the factory counter
    ///
    /// Both authorities of the child accept either its own key or
    /// `parent@active`.
    pub fn plan_account(&mut self, parent: &Name, name: Option<&str>) -> Result<AccountPlan> {
        if !self.accounts.contains_key(parent) {
            return Err(Error::UnknownAccount(parent.to_string()));
        }

        let name = match name {
            Some(explicit) => {
                let name = Name::new(explicit)?;
                if self.accounts.contains_key(&name) {
                    return Err(Error::DuplicateAccount(name.to_string()));
                }
                name
            }
            None => {
                let prefix = self.defaults.factory_prefix.clone();
                self.next_free_name(&prefix)?
            }
        };

        let key = KeyPair::generate();
        let authority =
            Authority::from_key(key.public()).with_account(PermissionLevel::active(parent), 1);
        Ok(AccountPlan {
            name,
            creator: parent.clone(),
            parent: Some(parent.clone()),
            key,
            owner: authority.clone(),
            active: authority,
        })
    }

    fn next_free_name(&mut self, prefix: &str) -> Result<Name> {
        loop {
            let name = counter_name(prefix, self.factory_counter)?;
            self.factory_counter += 1;
            if !self.accounts.contains_key(&name) {
                return Ok(name);
            }
        }
    }

    /// Record an account the node has created
    pub fn commit(&mut self, plan: AccountPlan) -> Result<Account> {
        if self.accounts.contains_key(&plan.name) {
            return Err(Error::DuplicateAccount(plan.name.to_string()));
        }

        let permissions = standard_permissions(plan.owner, plan.active);
        for permission in &permissions {
            self.graph.insert(&plan.name, permission.clone());
        }

        let public_key = plan.key.public();
        self.wallet.insert(public_key, plan.key);

        let account = Account {
            name: plan.name.clone(),
            parent: plan.parent,
            public_key,
            permissions,
            balances: BTreeMap::new(),
        };
        tracing::debug!(account = %account.name, parent = ?account.parent, "Registered account");
        self.accounts.insert(plan.name, account.clone());
        Ok(account)
    }

    /// The `eosio::updateauth` action installing `permission` on `account`
    ///
    /// Authorized by the parent permission (or `owner` for `owner` itself).
    pub fn update_auth_action(&self, account: &Name, permission: &Permission) -> Result<Action> {
        self.get(account)?;
        if !permission.authority.is_valid() {
            return Err(Error::TestAssertion(format!(
                "authority for {}@{} can never reach its threshold",
                account, permission.name
            )));
        }

        let authorizer = permission
            .parent
            .clone()
            .unwrap_or_else(|| Name::from_static(OWNER));
        Ok(Action {
            account: Name::from_static(SYSTEM_ACCOUNT),
            name: Name::from_static("updateauth"),
            authorization: vec![PermissionLevel::new(account.clone(), authorizer)],
            data: json!({
                "account": account,
                "permission": permission.name,
                "parent": permission.parent.as_ref().map(|p| p.as_str()).unwrap_or(""),
                "auth": permission.authority,
            }),
        })
    }

    /// Mirror a permission the node has accepted
    pub fn record_permission(&mut self, account: &Name, permission: Permission) -> Result<()> {
        let entry = self
            .accounts
            .get_mut(account)
            .ok_or_else(|| Error::UnknownAccount(account.to_string()))?;

        match entry.permissions.iter_mut().find(|p| p.name == permission.name) {
            Some(existing) => *existing = permission.clone(),
            None => entry.permissions.push(permission.clone()),
        }
        self.graph.insert(account, permission);
        Ok(())
    }

    pub fn get(&self, name: &Name) -> Result<&Account> {
        self.accounts
            .get(name)
            .ok_or_else(|| Error::UnknownAccount(name.to_string()))
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.accounts.contains_key(name)
    }

    /// All registered accounts, by name
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn graph(&self) -> &AuthorityGraph {
        &self.graph
    }

    /// Wallet keys that should sign for the declared authorizers
    ///
    /// Authorizers the wallet cannot cover contribute nothing; the node
    /// decides whether the transaction is authorized.
    pub fn signing_keys(&self, authorizers: &[PermissionLevel]) -> Vec<&KeyPair> {
        let held = |key: &PublicKey| self.wallet.contains_key(key);
        let mut keys: Vec<PublicKey> = Vec::new();
        for level in authorizers {
            for key in self.graph.signing_keys(level, &held) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys.iter().filter_map(|k| self.wallet.get(k)).collect()
    }

    /// Whether `member` transitively carries enough weight for `level`
    pub fn authorizes(&self, level: &PermissionLevel, member: &AuthorityMember) -> bool {
        self.graph.authorizes(level, member)
    }

    /// Store a balance read from the node
    pub fn cache_balance(&mut self, account: &Name, balance: Asset) {
        if let Some(entry) = self.accounts.get_mut(account) {
            entry.balances.insert(balance.symbol.code.clone(), balance);
        }
    }
}

fn standard_permissions(owner: Authority, active: Authority) -> Vec<Permission> {
    vec![
        Permission {
            name: Name::from_static(OWNER),
            parent: None,
            authority: owner,
        },
        Permission {
            name: Name::from_static(ACTIVE),
            parent: Some(Name::from_static(OWNER)),
            authority: active,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (AccountRegistry, KeyPair) {
        let system = KeyPair::generate();
        let mut registry = AccountRegistry::new(Defaults::default());
        registry.reset(&system);
        (registry, system)
    }

    fn create_master(registry: &mut AccountRegistry) -> Account {
        let plan = registry.plan_master_account().unwrap();
        registry.commit(plan).unwrap()
    }

    #[test]
    fn test_master_accounts_are_created_by_system() {
        let (mut registry, _) = registry();
        let plan = registry.plan_master_account().unwrap();
        assert_eq!(plan.name, "master");
        assert_eq!(plan.creator, SYSTEM_ACCOUNT);

        let action = plan.action();
        assert_eq!(action.label(), "eosio::newaccount");
        assert_eq!(action.authorization[0].to_string(), "eosio@active");

        registry.commit(plan).unwrap();
        let second = registry.plan_master_account().unwrap();
        assert_eq!(second.name, "master111111");
    }

    #[test]
    fn test_child_authority_delegates_to_parent() {
        let (mut registry, _) = registry();
        let master = create_master(&mut registry);
        let plan = registry.plan_account(&master.name, Some("admin")).unwrap();
        let admin = registry.commit(plan).unwrap();

        assert_eq!(admin.parent.as_ref(), Some(&master.name));
        assert!(registry.authorizes(&admin.active(), &AuthorityMember::Account(master.active())));
        assert!(registry.authorizes(&admin.owner(), &AuthorityMember::Key(master.public_key)));
        assert!(!registry.authorizes(&master.active(), &AuthorityMember::Key(admin.public_key)));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let (mut registry, _) = registry();
        let master = create_master(&mut registry);
        let plan = registry.plan_account(&master.name, Some("oooo")).unwrap();
        registry.commit(plan).unwrap();

        let err = registry.plan_account(&master.name, Some("oooo")).unwrap_err();
        assert!(matches!(err, Error::DuplicateAccount(ref n) if n == "oooo"));

        let err = registry.plan_account(&master.name, Some("eosio")).unwrap_err();
        assert!(matches!(err, Error::DuplicateAccount(_)));
    }

    #[test]
    fn test_factory_names_are_unique_and_restart_on_reset() {
        let (mut registry, system) = registry();
        let master = create_master(&mut registry);

        let first = registry.plan_account(&master.name, None).unwrap();
        let first = registry.commit(first).unwrap();
        let second = registry.plan_account(&master.name, None).unwrap();
        assert_ne!(first.name, second.name);
        assert_eq!(first.name, "tst111111111");

        registry.reset(&system);
        let master = create_master(&mut registry);
        let again = registry.plan_account(&master.name, None).unwrap();
        assert_eq!(again.name, "tst111111111");
    }

    #[test]
    fn test_unknown_parent() {
        let (mut registry, _) = registry();
        let ghost: Name = "ghost".parse().unwrap();
        assert!(matches!(
            registry.plan_account(&ghost, Some("child")),
            Err(Error::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_signing_keys_follow_declared_authorizers() {
        let (mut registry, system) = registry();
        let master = create_master(&mut registry);
        let plan = registry.plan_account(&master.name, Some("admin")).unwrap();
        let admin = registry.commit(plan).unwrap();

        let keys = registry.signing_keys(&[admin.active()]);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].public(), admin.public_key);

        let keys = registry.signing_keys(&[PermissionLevel::active(&Name::from_static(SYSTEM_ACCOUNT))]);
        assert_eq!(keys[0].public(), system.public());

        let stranger: PermissionLevel = "nobody@active".parse().unwrap();
        assert!(registry.signing_keys(&[stranger]).is_empty());
    }

    #[test]
    fn test_update_auth_is_mirrored() {
        let (mut registry, _) = registry();
        let master = create_master(&mut registry);
        let plan = registry.plan_account(&master.name, Some("admin")).unwrap();
        let admin = registry.commit(plan).unwrap();

        let custom = Permission {
            name: "burn".parse().unwrap(),
            parent: Some(Name::from_static(ACTIVE)),
            authority: Authority::from_key(master.public_key),
        };
        let action = registry.update_auth_action(&admin.name, &custom).unwrap();
        assert_eq!(action.authorization[0].to_string(), "admin@active");
        assert_eq!(action.data["parent"], "active");

        registry.record_permission(&admin.name, custom).unwrap();
        let level: PermissionLevel = "admin@burn".parse().unwrap();
        assert!(registry.authorizes(&level, &AuthorityMember::Key(master.public_key)));
        assert_eq!(registry.get(&admin.name).unwrap().permissions.len(), 3);
    }

    #[test]
    fn test_balance_cache() {
        let (mut registry, _) = registry();
        let master = create_master(&mut registry);
        let balance: Asset = "10.0000 ENTU".parse().unwrap();
        registry.cache_balance(&master.name, balance.clone());

        let code: SymbolCode = "ENTU".parse().unwrap();
        assert_eq!(
            registry.get(&master.name).unwrap().cached_balance(&code),
            Some(&balance)
        );
    }
}
