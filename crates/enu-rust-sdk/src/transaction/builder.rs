//! Transaction staging: ordered action collection, nested merging, and
//! all-or-nothing rollback.
//!
//! The builder is a small state machine. A staging closure appends actions
//! in call order; if it returns an error, everything staged is discarded and
//! the error surfaces to the caller unchanged.

use crate::abi::Abi;
use crate::error::{EnuError, EnuResult};
use crate::keys::KeyProvider;
use crate::transaction::types::{Action, ActionData, AuthSpec, PermissionLevel};
use crate::types::Name;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a [`TransactionBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// Nothing staged yet.
    Empty,
    /// A staging closure is running.
    Staging,
    /// The closure finished and the staged actions are final.
    Committed,
    /// The closure failed; staged actions were discarded.
    RolledBack,
}

/// An action waiting for encoding, with its per-action authorization
/// override if one was given.
#[derive(Debug, Clone)]
pub struct StagedAction {
    /// The action as staged.
    pub action: Action,
    /// Authorization specs attached to this action specifically.
    pub authorization: Option<Vec<AuthSpec>>,
}

/// Per-action options accepted while staging.
///
/// Only authorization is legal here; requesting transaction-level behavior
/// (sign/broadcast/keys) for a single action inside a transaction is a
/// [`EnuError::NestedCallback`].
#[derive(Clone, Default)]
pub struct ActionOptions {
    /// Authorization specs for this action.
    pub authorization: Option<Vec<AuthSpec>>,
    /// Broadcast override; never legal inside a transaction.
    pub broadcast: Option<bool>,
    /// Signing override; never legal inside a transaction.
    pub sign: Option<bool>,
    /// Key provider override; never legal inside a transaction.
    pub key_provider: Option<Arc<dyn KeyProvider>>,
}

impl fmt::Debug for ActionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionOptions")
            .field("authorization", &self.authorization)
            .field("broadcast", &self.broadcast)
            .field("sign", &self.sign)
            .field("has_key_provider", &self.key_provider.is_some())
            .finish()
    }
}

impl ActionOptions {
    /// Sets the authorization from `actor@permission` strings.
    pub fn with_authorization<'a>(
        mut self,
        specs: impl IntoIterator<Item = &'a str>,
    ) -> EnuResult<Self> {
        self.authorization = Some(
            specs
                .into_iter()
                .map(str::parse)
                .collect::<EnuResult<Vec<_>>>()?,
        );
        Ok(self)
    }

    /// Requests a broadcast override (rejected while staging).
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    /// Requests a signing override (rejected while staging).
    pub fn with_sign(mut self, sign: bool) -> Self {
        self.sign = Some(sign);
        self
    }

    /// Requests a key provider override (rejected while staging).
    pub fn with_key_provider(mut self, provider: Arc<dyn KeyProvider>) -> Self {
        self.key_provider = Some(provider);
        self
    }
}

/// Collects actions for one transaction.
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    state: BuilderState,
    actions: Vec<StagedAction>,
    context_free_actions: Vec<Action>,
}

impl Default for BuilderState {
    fn default() -> Self {
        Self::Empty
    }
}

impl TransactionBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Runs a staging closure.
    ///
    /// On success the builder commits; on error every staged action is
    /// discarded and the closure's error is returned verbatim.
    pub fn stage<F>(&mut self, abis: &HashMap<Name, Arc<Abi>>, f: F) -> EnuResult<()>
    where
        F: FnOnce(&mut StagingTransaction<'_>) -> EnuResult<()>,
    {
        if self.state != BuilderState::Empty {
            return Err(EnuError::transaction("transaction builder already used"));
        }
        self.state = BuilderState::Staging;
        let result = {
            let mut staging = StagingTransaction {
                builder: self,
                abis,
            };
            f(&mut staging)
        };
        match result {
            Ok(()) => {
                self.state = BuilderState::Committed;
                Ok(())
            }
            Err(e) => {
                self.actions.clear();
                self.context_free_actions.clear();
                self.state = BuilderState::RolledBack;
                Err(e)
            }
        }
    }

    /// Consumes a committed builder, yielding staged actions in call order.
    pub fn into_staged(self) -> EnuResult<(Vec<StagedAction>, Vec<Action>)> {
        match self.state {
            BuilderState::Committed => Ok((self.actions, self.context_free_actions)),
            state => Err(EnuError::transaction(format!(
                "builder is {state:?}, not committed"
            ))),
        }
    }
}

/// Handle given to staging closures for appending actions.
#[derive(Debug)]
pub struct StagingTransaction<'a> {
    builder: &'a mut TransactionBuilder,
    abis: &'a HashMap<Name, Arc<Abi>>,
}

impl<'a> StagingTransaction<'a> {
    /// Appends an action.
    pub fn action(&mut self, action: Action) -> EnuResult<()> {
        self.builder.actions.push(StagedAction {
            action,
            authorization: None,
        });
        Ok(())
    }

    /// Appends an action with per-action options.
    pub fn action_with_options(
        &mut self,
        action: Action,
        options: &ActionOptions,
    ) -> EnuResult<()> {
        if options.broadcast.is_some() || options.sign.is_some() || options.key_provider.is_some()
        {
            return Err(EnuError::NestedCallback);
        }
        self.builder.actions.push(StagedAction {
            action,
            authorization: options.authorization.clone(),
        });
        Ok(())
    }

    /// Appends a context-free action. These carry no authorization.
    pub fn context_free_action(&mut self, action: Action) -> EnuResult<()> {
        if !action.authorization.is_empty() {
            return Err(EnuError::transaction(
                "context-free actions cannot carry authorization",
            ));
        }
        self.builder.context_free_actions.push(action);
        Ok(())
    }

    /// Returns an action handle for one of the transaction's declared
    /// contracts.
    pub fn contract(&mut self, account: &str) -> EnuResult<StagedContract<'_, 'a>> {
        let account: Name = account.parse()?;
        let abi = self.abis.get(&account).cloned().ok_or_else(|| {
            EnuError::transaction(format!(
                "contract `{account}` was not declared for this transaction"
            ))
        })?;
        Ok(StagedContract {
            staging: self,
            account,
            abi,
        })
    }

    /// Runs a nested construction closure.
    ///
    /// Nested transactions do not exist on chain; the closure's actions merge
    /// into this transaction's pending list in call order.
    pub fn transaction<F>(&mut self, f: F) -> EnuResult<()>
    where
        F: FnOnce(&mut StagingTransaction<'_>) -> EnuResult<()>,
    {
        f(self)
    }
}

/// Stages actions against one contract, validating action names against its
/// ABI.
#[derive(Debug)]
pub struct StagedContract<'s, 'a> {
    staging: &'s mut StagingTransaction<'a>,
    account: Name,
    abi: Arc<Abi>,
}

impl StagedContract<'_, '_> {
    /// Stages an action on this contract.
    pub fn action(&mut self, name: &str, args: Value) -> EnuResult<()> {
        self.action_with_options(name, args, &ActionOptions::default())
    }

    /// Stages an action with per-action options.
    pub fn action_with_options(
        &mut self,
        name: &str,
        args: Value,
        options: &ActionOptions,
    ) -> EnuResult<()> {
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
        self.staging.action_with_options(action, options)
    }
}

/// Resolves an action's authorization.
///
/// Precedence: explicit typed authorization on the action, then the supplied
/// specs (per-action over per-call over configured, chosen by the caller),
/// then an actor derived from the payload's first name-typed ABI field with
/// permission `active`. Multiple resolved pairs sort by actor then
/// permission; explicit typed lists are never reordered.
pub fn resolve_authorization(
    action: &Action,
    specs: Option<&[AuthSpec]>,
    abi: Option<&Abi>,
) -> EnuResult<Vec<PermissionLevel>> {
    if !action.authorization.is_empty() {
        return Ok(action.authorization.clone());
    }
    let active: Name = "active".parse()?;
    match specs {
        Some(specs) if !specs.is_empty() => {
            let mut levels = Vec::with_capacity(specs.len());
            for spec in specs {
                let actor = match spec.actor {
                    Some(actor) => actor,
                    None => derived_actor(action, abi)?,
                };
                levels.push(PermissionLevel {
                    actor,
                    permission: spec.permission.unwrap_or(active),
                });
            }
            if levels.len() > 1 {
                levels.sort_by_key(|l| (l.actor.to_string(), l.permission.to_string()));
            }
            Ok(levels)
        }
        _ => Ok(vec![PermissionLevel {
            actor: derived_actor(action, abi)?,
            permission: active,
        }]),
    }
}

fn derived_actor(action: &Action, abi: Option<&Abi>) -> EnuResult<Name> {
    let fail = |why: &str| {
        EnuError::transaction(format!(
            "cannot derive authorization for {}::{}: {why}",
            action.account, action.name
        ))
    };
    let abi = abi.ok_or_else(|| fail("no ABI available"))?;
    let data = action
        .data
        .as_structured()
        .ok_or_else(|| fail("action data is already packed"))?;
    let def = abi
        .action_struct(&action.name.to_string())
        .ok_or_else(|| fail("action is not in the ABI"))?;
    let field = def
        .fields
        .iter()
        .find(|f| is_name_family(abi.resolve_type(&f.type_name)))
        .ok_or_else(|| fail("no name-typed field to infer an actor from"))?;
    let actor = data
        .get(&field.name)
        .and_then(Value::as_str)
        .ok_or_else(|| fail("actor field is absent from the payload"))?;
    actor.parse()
}

fn is_name_family(type_name: &str) -> bool {
    matches!(
        type_name,
        "name" | "account_name" | "action_name" | "permission_name"
    )
}
