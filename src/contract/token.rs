//! Typed handle for a standard token contract

use serde_json::json;

use crate::chain::{Asset, Name, PermissionLevel};
use crate::common::{Error, Result};
use crate::scenario::Scenario;
use crate::tx::Receipt;

use super::pipeline::ContractHandle;

const REQUIRED_ACTIONS: &[&str] = &["create", "issue", "transfer"];

/// A deployed token contract (`create`, `issue`, `transfer`, `retire`)
#[derive(Debug, Clone)]
pub struct TokenContract {
    handle: ContractHandle,
}

impl TokenContract {
    /// Wrap a handle whose ABI declares the token actions
    pub fn new(handle: ContractHandle) -> Result<Self> {
        for action in REQUIRED_ACTIONS {
            if !handle.abi.has_action(action) {
                return Err(Error::UnknownAction {
                    contract: handle.account.to_string(),
                    action: action.to_string(),
                });
            }
        }
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &ContractHandle {
        &self.handle
    }

    pub fn account(&self) -> &Name {
        &self.handle.account
    }

    /// Create a symbol with `issuer` and a maximum supply such as
    /// `"1000000000.0000 ENTU"`
    ///
    /// Transfers of the new symbol are routed to this contract afterwards.
    pub async fn create(
        &self,
        ctx: &mut Scenario,
        issuer: &impl AsRef<Name>,
        maximum_supply: &str,
    ) -> Result<Receipt> {
        let maximum_supply: Asset = maximum_supply.parse()?;
        let issuer = issuer.as_ref();
        let invocation = self.handle.invocation(
            "create",
            json!({
                "issuer": issuer,
                "maximum_supply": maximum_supply,
            }),
            &[PermissionLevel::active(issuer), self.handle.active()],
        )?;
        let receipt = ctx.invoke(invocation).await?;
        ctx.route_symbol(maximum_supply.symbol.code.clone(), self.account().clone());
        Ok(receipt)
    }

    /// Issue `quantity` to its issuer
    pub async fn issue(
        &self,
        ctx: &mut Scenario,
        issuer: &impl AsRef<Name>,
        quantity: &str,
        memo: &str,
    ) -> Result<Receipt> {
        let quantity: Asset = quantity.parse()?;
        let issuer = issuer.as_ref();
        let invocation = self.handle.invocation(
            "issue",
            json!({ "to": issuer, "quantity": quantity, "memo": memo }),
            &[PermissionLevel::active(issuer)],
        )?;
        ctx.invoke(invocation).await
    }

    /// Transfer on this contract regardless of symbol routing
    pub async fn transfer(
        &self,
        ctx: &mut Scenario,
        from: &impl AsRef<Name>,
        to: &impl AsRef<Name>,
        quantity: &str,
        memo: &str,
    ) -> Result<Receipt> {
        let quantity: Asset = quantity.parse()?;
        let from = from.as_ref();
        let invocation = self.handle.invocation(
            "transfer",
            json!({ "from": from, "to": to.as_ref(), "quantity": quantity, "memo": memo }),
            &[PermissionLevel::active(from)],
        )?;
        ctx.invoke(invocation).await
    }

    /// Take `quantity` out of circulation from the issuer's balance
    pub async fn retire(
        &self,
        ctx: &mut Scenario,
        issuer: &impl AsRef<Name>,
        quantity: &str,
        memo: &str,
    ) -> Result<Receipt> {
        let quantity: Asset = quantity.parse()?;
        let invocation = self.handle.invocation(
            "retire",
            json!({ "quantity": quantity, "memo": memo }),
            &[PermissionLevel::active(issuer.as_ref())],
        )?;
        ctx.invoke(invocation).await
    }

    /// Balance of `symbol` held by `owner` on this contract
    pub async fn balance(
        &self,
        ctx: &mut Scenario,
        owner: &impl AsRef<Name>,
        symbol: &str,
    ) -> Result<Asset> {
        ctx.get_balance_on(self.account(), owner, symbol).await
    }
}

impl AsRef<Name> for TokenContract {
    fn as_ref(&self) -> &Name {
        self.account()
    }
}
