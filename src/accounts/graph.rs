//! Directed weighted authority graph
//!
//! Nodes are permission levels (`account@permission`). Each permission has
//! weighted edges to keys and to delegated permission levels, plus an
//! implicit edge to its parent permission (a parent always satisfies its
//! children). Evaluation is bounded by [`MAX_AUTHORITY_DEPTH`], which also
//! cuts delegation cycles.

use std::collections::{BTreeMap, HashSet};

use crate::chain::{Name, Permission, PermissionLevel, PublicKey};

/// Maximum delegation depth followed during evaluation
pub const MAX_AUTHORITY_DEPTH: usize = 6;

/// Something that can appear inside an authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityMember {
    Key(PublicKey),
    Account(PermissionLevel),
}

#[derive(Debug, Default, Clone)]
pub struct AuthorityGraph {
    permissions: BTreeMap<PermissionLevel, Permission>,
}

impl AuthorityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a permission of `account`
    pub fn insert(&mut self, account: &Name, permission: Permission) {
        let level = PermissionLevel::new(account.clone(), permission.name.clone());
        self.permissions.insert(level, permission);
    }

    pub fn get(&self, level: &PermissionLevel) -> Option<&Permission> {
        self.permissions.get(level)
    }

    /// Permissions of one account, in name order
    pub fn permissions_of<'a>(&'a self, account: &'a Name) -> impl Iterator<Item = &'a Permission> + 'a {
        self.permissions
            .iter()
            .filter(move |(level, _)| &level.actor == account)
            .map(|(_, permission)| permission)
    }

    pub fn clear(&mut self) {
        self.permissions.clear();
    }

    /// Whether the provided keys satisfy `level`
    pub fn satisfied_by_keys(&self, level: &PermissionLevel, keys: &HashSet<PublicKey>) -> bool {
        self.evaluate(level, keys, None, 0)
    }

    /// Whether `member` on its own carries enough weight to satisfy `level`,
    /// following delegations transitively
    pub fn authorizes(&self, level: &PermissionLevel, member: &AuthorityMember) -> bool {
        match member {
            AuthorityMember::Key(key) => {
                let keys = HashSet::from([*key]);
                self.evaluate(level, &keys, None, 0)
            }
            AuthorityMember::Account(granted) => self.evaluate(level, &HashSet::new(), Some(granted), 0),
        }
    }

    fn evaluate(
        &self,
        level: &PermissionLevel,
        keys: &HashSet<PublicKey>,
        granted: Option<&PermissionLevel>,
        depth: usize,
    ) -> bool {
        if granted == Some(level) {
            return true;
        }
        if depth > MAX_AUTHORITY_DEPTH {
            return false;
        }
        let Some(permission) = self.permissions.get(level) else {
            return false;
        };

        let authority = &permission.authority;
        let mut weight: u64 = authority
            .keys
            .iter()
            .filter(|k| keys.contains(&k.key))
            .map(|k| k.weight as u64)
            .sum();

        for delegated in &authority.accounts {
            if weight >= authority.threshold as u64 {
                break;
            }
            if self.evaluate(&delegated.permission, keys, granted, depth + 1) {
                weight += delegated.weight as u64;
            }
        }

        if weight >= authority.threshold as u64 {
            return true;
        }

        match &permission.parent {
            Some(parent) => {
                let parent_level = PermissionLevel::new(level.actor.clone(), parent.clone());
                self.evaluate(&parent_level, keys, granted, depth + 1)
            }
            None => false,
        }
    }

    /// Keys, among those `held`, that should sign for `level`
    ///
    /// Direct keys come first; delegated and parent permissions are only
    /// followed while the collected keys fall short of the threshold.
    pub fn signing_keys(
        &self,
        level: &PermissionLevel,
        held: &dyn Fn(&PublicKey) -> bool,
    ) -> Vec<PublicKey> {
        let mut collected = Vec::new();
        self.collect_keys(level, held, &mut collected, 0);
        collected
    }

    fn collect_keys(
        &self,
        level: &PermissionLevel,
        held: &dyn Fn(&PublicKey) -> bool,
        collected: &mut Vec<PublicKey>,
        depth: usize,
    ) {
        if depth > MAX_AUTHORITY_DEPTH {
            return;
        }
        let Some(permission) = self.permissions.get(level) else {
            return;
        };

        for kw in &permission.authority.keys {
            if held(&kw.key) && !collected.contains(&kw.key) {
                collected.push(kw.key);
            }
        }
        if self.satisfied_by_keys(level, &collected.iter().copied().collect()) {
            return;
        }

        for delegated in &permission.authority.accounts {
            self.collect_keys(&delegated.permission, held, collected, depth + 1);
        }
        if let Some(parent) = &permission.parent {
            let parent_level = PermissionLevel::new(level.actor.clone(), parent.clone());
            self.collect_keys(&parent_level, held, collected, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Authority, KeyPair, ACTIVE, OWNER};

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn standard(graph: &mut AuthorityGraph, account: &str, key: PublicKey, delegate: Option<&str>) {
        let mut authority = Authority::from_key(key);
        if let Some(parent) = delegate {
            authority = authority.with_account(PermissionLevel::active(&name(parent)), 1);
        }
        graph.insert(
            &name(account),
            Permission {
                name: name(OWNER),
                parent: None,
                authority: authority.clone(),
            },
        );
        graph.insert(
            &name(account),
            Permission {
                name: name(ACTIVE),
                parent: Some(name(OWNER)),
                authority,
            },
        );
    }

    #[test]
    fn test_delegation_is_transitive() {
        let master = KeyPair::generate().public();
        let admin = KeyPair::generate().public();
        let leaf = KeyPair::generate().public();
        let mut graph = AuthorityGraph::new();
        standard(&mut graph, "master", master, None);
        standard(&mut graph, "admin", admin, Some("master"));
        standard(&mut graph, "leaf", leaf, Some("admin"));

        let leaf_active = PermissionLevel::active(&name("leaf"));
        assert!(graph.authorizes(&leaf_active, &AuthorityMember::Key(leaf)));
        assert!(graph.authorizes(&leaf_active, &AuthorityMember::Key(admin)));
        assert!(graph.authorizes(&leaf_active, &AuthorityMember::Key(master)));
        assert!(graph.authorizes(
            &leaf_active,
            &AuthorityMember::Account(PermissionLevel::active(&name("master")))
        ));

        let master_active = PermissionLevel::active(&name("master"));
        assert!(!graph.authorizes(&master_active, &AuthorityMember::Key(leaf)));
    }

    #[test]
    fn test_threshold_requires_enough_weight() {
        let a = KeyPair::generate().public();
        let b = KeyPair::generate().public();
        let mut graph = AuthorityGraph::new();
        graph.insert(
            &name("multisig"),
            Permission {
                name: name(ACTIVE),
                parent: None,
                authority: Authority {
                    threshold: 2,
                    keys: Vec::new(),
                    accounts: Vec::new(),
                }
                .with_key(a, 1)
                .with_key(b, 1),
            },
        );

        let level = PermissionLevel::active(&name("multisig"));
        assert!(!graph.authorizes(&level, &AuthorityMember::Key(a)));
        assert!(graph.satisfied_by_keys(&level, &HashSet::from([a, b])));
    }

    #[test]
    fn test_parent_permission_satisfies_child() {
        let owner_key = KeyPair::generate().public();
        let active_key = KeyPair::generate().public();
        let mut graph = AuthorityGraph::new();
        graph.insert(
            &name("alice"),
            Permission {
                name: name(OWNER),
                parent: None,
                authority: Authority::from_key(owner_key),
            },
        );
        graph.insert(
            &name("alice"),
            Permission {
                name: name(ACTIVE),
                parent: Some(name(OWNER)),
                authority: Authority::from_key(active_key),
            },
        );

        let active = PermissionLevel::active(&name("alice"));
        let owner = PermissionLevel::owner(&name("alice"));
        assert!(graph.satisfied_by_keys(&active, &HashSet::from([owner_key])));
        assert!(!graph.satisfied_by_keys(&owner, &HashSet::from([active_key])));
    }

    #[test]
    fn test_cycles_terminate() {
        let mut graph = AuthorityGraph::new();
        for (account, other) in [("ping", "pong"), ("pong", "ping")] {
            graph.insert(
                &name(account),
                Permission {
                    name: name(ACTIVE),
                    parent: None,
                    authority: Authority {
                        threshold: 1,
                        keys: Vec::new(),
                        accounts: Vec::new(),
                    }
                    .with_account(PermissionLevel::active(&name(other)), 1),
                },
            );
        }
        let stranger = KeyPair::generate().public();
        assert!(!graph.satisfied_by_keys(
            &PermissionLevel::active(&name("ping")),
            &HashSet::from([stranger])
        ));
    }

    #[test]
    fn test_signing_keys_prefers_direct_keys() {
        let master = KeyPair::generate().public();
        let admin = KeyPair::generate().public();
        let mut graph = AuthorityGraph::new();
        standard(&mut graph, "master", master, None);
        standard(&mut graph, "admin", admin, Some("master"));

        let level = PermissionLevel::active(&name("admin"));
        assert_eq!(graph.signing_keys(&level, &|_| true), vec![admin]);
        // Without the admin key the wallet falls back to the delegated master key
        assert_eq!(graph.signing_keys(&level, &|k| *k == master), vec![master]);
    }
}
