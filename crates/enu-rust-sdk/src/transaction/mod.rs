//! Transaction assembly: wire types, the staging builder, and the contract
//! proxy.

pub mod builder;
pub mod contract;
pub mod types;

pub use builder::{
    resolve_authorization, ActionOptions, BuilderState, StagedAction, StagedContract,
    StagingTransaction, TransactionBuilder,
};
pub use contract::Contract;
pub use types::{
    Action, ActionData, AuthSpec, PermissionLevel, SignedTransaction, Transaction,
    TransactionHeader, TransactionIntent,
};
