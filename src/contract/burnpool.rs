//! Typed handle for the burn-pool contract
//!
//! The pool holds one pair per token symbol. Deposits of a paired token grow
//! the pair's balance; a transfer whose memo names a symbol (`"6,MUSDT"`)
//! burns the transferred quantity against that pair.

use serde_json::{json, Value};

use crate::chain::{Asset, Name, Symbol};
use crate::common::{Error, Result};
use crate::scenario::Scenario;
use crate::tx::Receipt;

use super::pipeline::ContractHandle;

const SYMPAIR_TABLE: &str = "sympairs";

#[derive(Debug, Clone)]
pub struct BurnPoolContract {
    handle: ContractHandle,
}

impl BurnPoolContract {
    pub fn new(handle: ContractHandle) -> Result<Self> {
        if !handle.abi.has_action("setsympair") {
            return Err(Error::UnknownAction {
                contract: handle.account.to_string(),
                action: "setsympair".to_string(),
            });
        }
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &ContractHandle {
        &self.handle
    }

    pub fn account(&self) -> &Name {
        &self.handle.account
    }

    /// Register a pair for `token_symbol` (e.g. `"6,MUSDT"`), paid out by
    /// `token_bank`, with `base_fgt_amount` as its base burn amount
    pub async fn set_sym_pair(
        &self,
        ctx: &mut Scenario,
        token_symbol: &str,
        token_bank: &impl AsRef<Name>,
        base_fgt_amount: &str,
    ) -> Result<Receipt> {
        let token_symbol: Symbol = token_symbol.parse()?;
        let base_fgt_amount: Asset = base_fgt_amount.parse()?;
        let invocation = self.handle.invocation(
            "setsympair",
            json!({
                "token_symbol": token_symbol,
                "token_bank": token_bank.as_ref(),
                "base_fgt_amount": base_fgt_amount,
            }),
            &[self.handle.active()],
        )?;
        ctx.invoke(invocation).await
    }

    /// Enable or disable the pair of `sympair_code` (e.g. `"musdt"`)
    pub async fn open_sym_pair(
        &self,
        ctx: &mut Scenario,
        sympair_code: &str,
        on_off: bool,
    ) -> Result<Receipt> {
        let sympair_code = Name::new(sympair_code)?;
        let invocation = self.handle.invocation(
            "opensympair",
            json!({ "sympair_code": sympair_code, "on_off": on_off }),
            &[self.handle.active()],
        )?;
        ctx.invoke(invocation).await
    }

    /// Current rows of the pair table
    pub async fn sym_pairs(&self, ctx: &mut Scenario) -> Result<Vec<Value>> {
        let scope = self.account().to_string();
        ctx.read_table(self.account(), &scope, SYMPAIR_TABLE).await
    }
}

impl AsRef<Name> for BurnPoolContract {
    fn as_ref(&self) -> &Name {
        self.account()
    }
}
