//! Symbol to token contract routing

use std::collections::HashMap;

use crate::chain::{Name, SymbolCode};

/// Remembers which token contract created each symbol
#[derive(Debug, Clone)]
pub struct TokenRouter {
    default_contract: Name,
    routes: HashMap<SymbolCode, Name>,
}

impl TokenRouter {
    pub fn new(default_contract: Name) -> Self {
        Self {
            default_contract,
            routes: HashMap::new(),
        }
    }

    /// Claim `code` for `contract`; a later claim replaces an earlier one
    pub fn register(&mut self, code: SymbolCode, contract: Name) {
        tracing::debug!(symbol = %code, contract = %contract, "Routing symbol");
        self.routes.insert(code, contract);
    }

    /// Contract handling transfers of `code`
    pub fn route(&self, code: &SymbolCode) -> &Name {
        self.routes.get(code).unwrap_or(&self.default_contract)
    }

    pub fn default_contract(&self) -> &Name {
        &self.default_contract
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclaimed_symbols_use_default() {
        let mut router = TokenRouter::new("amax.token".parse().unwrap());
        let musdt: SymbolCode = "MUSDT".parse().unwrap();
        let entu: SymbolCode = "ENTU".parse().unwrap();

        router.register(musdt.clone(), "amax.mtoken".parse().unwrap());
        assert_eq!(router.route(&musdt), "amax.mtoken");
        assert_eq!(router.route(&entu), "amax.token");

        router.clear();
        assert_eq!(router.route(&musdt), router.default_contract());
    }
}
