//! Contract ABI documents
//!
//! The JSON ABI format produced by the contract toolchain: a version tag,
//! struct definitions, the action list (each naming its parameter struct),
//! and the table list.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::chain::Name;
use crate::common::{Error, Result};

const VERSION_PREFIX: &str = "eosio::abi/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiStruct {
    pub name: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<AbiField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiAction {
    pub name: Name,
    /// Parameter struct
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub ricardian_contract: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiTable {
    pub name: Name,
    /// Row struct
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_index_type")]
    pub index_type: String,
    #[serde(default)]
    pub key_names: Vec<String>,
    #[serde(default)]
    pub key_types: Vec<String>,
}

fn default_index_type() -> String {
    "i64".to_string()
}

/// A contract's action and table interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abi {
    pub version: String,
    #[serde(default)]
    pub structs: Vec<AbiStruct>,
    #[serde(default)]
    pub actions: Vec<AbiAction>,
    #[serde(default)]
    pub tables: Vec<AbiTable>,
}

impl Abi {
    /// Parse and validate an ABI document
    pub fn parse(json: &str) -> Result<Self> {
        let abi: Abi =
            serde_json::from_str(json).map_err(|e| Error::InvalidAbi(e.to_string()))?;
        abi.validate()?;
        Ok(abi)
    }

    /// Check structural consistency
    ///
    /// Actions and tables must reference declared structs, and no name may be
    /// declared twice.
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with(VERSION_PREFIX) {
            return Err(Error::InvalidAbi(format!(
                "unsupported version '{}'",
                self.version
            )));
        }

        let mut structs = HashSet::new();
        for s in &self.structs {
            if !structs.insert(s.name.as_str()) {
                return Err(Error::InvalidAbi(format!("struct '{}' declared twice", s.name)));
            }
        }
        for s in &self.structs {
            if !s.base.is_empty() && !structs.contains(s.base.as_str()) {
                return Err(Error::InvalidAbi(format!(
                    "struct '{}' extends unknown base '{}'",
                    s.name, s.base
                )));
            }
        }

        let mut actions = HashSet::new();
        for action in &self.actions {
            if !actions.insert(&action.name) {
                return Err(Error::InvalidAbi(format!(
                    "action '{}' declared twice",
                    action.name
                )));
            }
            if !structs.contains(action.type_name.as_str()) {
                return Err(Error::InvalidAbi(format!(
                    "action '{}' uses undeclared struct '{}'",
                    action.name, action.type_name
                )));
            }
        }

        for table in &self.tables {
            if !structs.contains(table.type_name.as_str()) {
                return Err(Error::InvalidAbi(format!(
                    "table '{}' uses undeclared struct '{}'",
                    table.name, table.type_name
                )));
            }
        }

        Ok(())
    }

    pub fn action(&self, name: &str) -> Option<&AbiAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.action(name).is_some()
    }

    pub fn action_names(&self) -> impl Iterator<Item = &Name> {
        self.actions.iter().map(|a| &a.name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    /// Parameter names of an action, base struct fields first
    pub fn action_fields(&self, name: &str) -> Option<Vec<&str>> {
        let action = self.action(name)?;
        let mut fields = Vec::new();
        self.collect_fields(&action.type_name, &mut fields, 0);
        Some(fields)
    }

    fn collect_fields<'a>(&'a self, struct_name: &str, fields: &mut Vec<&'a str>, depth: usize) {
        // Bases are validated to exist, but may still form a loop
        if depth > self.structs.len() {
            return;
        }
        if let Some(s) = self.structs.iter().find(|s| s.name == struct_name) {
            if !s.base.is_empty() {
                self.collect_fields(&s.base, fields, depth + 1);
            }
            fields.extend(s.fields.iter().map(|f| f.name.as_str()));
        }
    }
}
