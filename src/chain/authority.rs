//! Permission levels and weighted authorities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::keys::PublicKey;
use super::name::Name;
use crate::common::{Error, Result};

pub const OWNER: &str = "owner";
pub const ACTIVE: &str = "active";

/// An (account, permission) pair, written `account@permission`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: Name, permission: Name) -> Self {
        Self { actor, permission }
    }

    /// `actor@active`
    pub fn active(actor: &Name) -> Self {
        Self::new(actor.clone(), Name::from_static(ACTIVE))
    }

    /// `actor@owner`
    pub fn owner(actor: &Name) -> Self {
        Self::new(actor.clone(), Name::from_static(OWNER))
    }
}

impl FromStr for PermissionLevel {
    type Err = Error;

    /// Parse `account@permission`, defaulting to `active` when no `@` is given
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('@') {
            Some((actor, permission)) => Ok(Self::new(actor.parse()?, permission.parse()?)),
            None => Ok(Self::active(&s.parse()?)),
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

/// A key with its weight inside an authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
    pub key: PublicKey,
    pub weight: u16,
}

/// A delegated account permission with its weight inside an authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevelWeight {
    pub permission: PermissionLevel,
    pub weight: u16,
}

/// Threshold-weighted set of keys and delegated permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub threshold: u32,
    #[serde(default)]
    pub keys: Vec<KeyWeight>,
    #[serde(default)]
    pub accounts: Vec<PermissionLevelWeight>,
}

impl Authority {
    /// Single key with weight equal to the threshold
    pub fn from_key(key: PublicKey) -> Self {
        Self {
            threshold: 1,
            keys: vec![KeyWeight { key, weight: 1 }],
            accounts: Vec::new(),
        }
    }

    /// Add a delegated permission with the given weight
    pub fn with_account(mut self, permission: PermissionLevel, weight: u16) -> Self {
        self.accounts.push(PermissionLevelWeight { permission, weight });
        self
    }

    /// Add a key with the given weight
    pub fn with_key(mut self, key: PublicKey, weight: u16) -> Self {
        self.keys.push(KeyWeight { key, weight });
        self
    }

    /// Whether the threshold is reachable at all
    pub fn is_valid(&self) -> bool {
        let total: u64 = self
            .keys
            .iter()
            .map(|k| k.weight as u64)
            .chain(self.accounts.iter().map(|a| a.weight as u64))
            .sum();
        self.threshold > 0 && total >= self.threshold as u64
    }
}

/// A named permission of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: Name,
    /// Parent permission; `None` only for `owner`
    pub parent: Option<Name>,
    pub authority: Authority,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::keys::KeyPair;

    #[test]
    fn test_parse_permission_level() {
        let level: PermissionLevel = "admin@owner".parse().unwrap();
        assert_eq!(level.actor, "admin");
        assert_eq!(level.permission, "owner");

        let implicit: PermissionLevel = "admin".parse().unwrap();
        assert_eq!(implicit.to_string(), "admin@active");

        assert!("admin@".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn test_authority_validity() {
        let key = KeyPair::generate().public();
        assert!(Authority::from_key(key).is_valid());

        let unreachable = Authority {
            threshold: 3,
            keys: vec![KeyWeight { key, weight: 1 }],
            accounts: Vec::new(),
        };
        assert!(!unreachable.is_valid());

        let parent: PermissionLevel = "master@active".parse().unwrap();
        let mut combined = Authority::from_key(key).with_account(parent, 2);
        combined.threshold = 3;
        assert!(combined.is_valid());
    }
}
