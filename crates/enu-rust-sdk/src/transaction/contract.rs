//! Contract-scoped transaction entry points.

use crate::abi::Abi;
use crate::config::TxOptions;
use crate::enu::{Enu, TransactionResult};
use crate::error::{EnuError, EnuResult};
use crate::transaction::builder::StagingTransaction;
use crate::transaction::types::{Action, ActionData};
use crate::types::Name;
use serde_json::Value;
use std::sync::Arc;

/// A handle scoped to one contract account, with its ABI already loaded.
///
/// Obtained from [`Enu::contract`]; action names are validated against the
/// ABI before anything touches the network.
#[derive(Debug)]
pub struct Contract<'a> {
    enu: &'a Enu,
    account: Name,
    abi: Arc<Abi>,
}

impl<'a> Contract<'a> {
    pub(crate) fn new(enu: &'a Enu, account: Name, abi: Arc<Abi>) -> Self {
        Self { enu, account, abi }
    }

    /// The contract account.
    pub fn account(&self) -> Name {
        self.account
    }

    /// The contract's ABI.
    pub fn abi(&self) -> &Arc<Abi> {
        &self.abi
    }

    /// Submits a single action on this contract.
    pub async fn push_action(
        &self,
        name: &str,
        args: Value,
        options: TxOptions,
    ) -> EnuResult<TransactionResult> {
        if !self.abi.has_action(name) {
            return Err(EnuError::transaction(format!(
                "contract `{}` has no action `{name}`",
                self.account
            )));
        }
        let action = Action {
            account: self.account,
            name: name.parse()?,
            authorization: Vec::new(),
            data: ActionData::Structured(args),
        };
        self.enu.push_actions(vec![action], options).await
    }

    /// Runs a staging closure with this contract declared, then submits the
    /// staged actions as one transaction.
    pub async fn transaction<F>(&self, f: F, options: TxOptions) -> EnuResult<TransactionResult>
    where
        F: FnOnce(&mut StagingTransaction<'_>) -> EnuResult<()>,
    {
        let account = self.account.to_string();
        self.enu
            .transaction_contracts(&[account.as_str()], f, options)
            .await
    }
}
