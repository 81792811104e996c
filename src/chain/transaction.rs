//! Actions, transactions, and their signatures

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::authority::PermissionLevel;
use super::keys::{KeyPair, PublicKey, Signature};
use super::name::Name;
use crate::common::Result;

/// Account hosting the system actions (`newaccount`, `updateauth`, `setcode`, `setabi`)
pub const SYSTEM_ACCOUNT: &str = "eosio";

/// One contract call inside a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Contract account
    pub account: Name,
    /// Action name
    pub name: Name,
    /// Declared authorizers, in caller order
    pub authorization: Vec<PermissionLevel>,
    /// Structured parameters
    pub data: Value,
}

impl Action {
    /// `contract::action`, as used in diagnostics
    pub fn label(&self) -> String {
        format!("{}::{}", self.account, self.name)
    }
}

/// An ordered list of actions applied atomically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Client-chosen sequence number, makes identical payloads distinct
    pub nonce: u64,
    pub actions: Vec<Action>,
}

impl Transaction {
    /// SHA-256 over the canonical JSON encoding
    ///
    /// `serde_json` maps are ordered, so both ends compute the same bytes.
    pub fn digest(&self) -> Result<[u8; 32]> {
        let bytes = serde_json::to_vec(self)?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Transaction id as lowercase hex of the digest
    pub fn id(&self) -> Result<String> {
        Ok(hex::encode(self.digest()?))
    }

    /// Sign with each key, in order
    pub fn sign(self, keys: &[&KeyPair]) -> Result<SignedTransaction> {
        let digest = self.digest()?;
        let signatures = keys
            .iter()
            .map(|pair| SignatureEntry {
                key: pair.public(),
                signature: pair.sign(&digest),
            })
            .collect();
        Ok(SignedTransaction {
            transaction: self,
            signatures,
        })
    }
}

/// A public key and its signature over the transaction digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub key: PublicKey,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<SignatureEntry>,
}

impl SignedTransaction {
    /// Keys whose signatures verify against the transaction digest
    pub fn verified_keys(&self) -> Result<Vec<PublicKey>> {
        let digest = self.transaction.digest()?;
        Ok(self
            .signatures
            .iter()
            .filter(|entry| entry.key.verify(&digest, &entry.signature))
            .map(|entry| entry.key)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer(nonce: u64) -> Transaction {
        let from: Name = "alice".parse().unwrap();
        Transaction {
            nonce,
            actions: vec![Action {
                account: "amax.token".parse().unwrap(),
                name: "transfer".parse().unwrap(),
                authorization: vec![PermissionLevel::active(&from)],
                data: json!({
                    "from": "alice",
                    "to": "bob",
                    "quantity": "1.0000 ENTU",
                    "memo": ""
                }),
            }],
        }
    }

    #[test]
    fn test_ids_differ_by_nonce() {
        assert_ne!(transfer(1).id().unwrap(), transfer(2).id().unwrap());
        assert_eq!(transfer(1).id().unwrap(), transfer(1).id().unwrap());
    }

    #[test]
    fn test_signatures_verify_after_wire_round_trip() {
        let pair = KeyPair::generate();
        let signed = transfer(7).sign(&[&pair]).unwrap();

        let wire = serde_json::to_string(&signed).unwrap();
        let received: SignedTransaction = serde_json::from_str(&wire).unwrap();
        assert_eq!(received.verified_keys().unwrap(), vec![pair.public()]);

        let mut tampered = received.clone();
        tampered.transaction.actions[0].data["quantity"] = json!("1000.0000 ENTU");
        assert!(tampered.verified_keys().unwrap().is_empty());
    }

    #[test]
    fn test_action_label() {
        assert_eq!(transfer(0).actions[0].label(), "amax.token::transfer");
    }
}
