//! Provider traits at the network boundary.
//!
//! Each trait covers one thing the transaction pipeline may need from the
//! outside world. [`NodeClient`](super::NodeClient) implements all of them;
//! tests and offline callers substitute their own.

use crate::api::response::PushedTransaction;
use crate::crypto::PublicKey;
use crate::error::EnuResult;
use crate::transaction::{SignedTransaction, Transaction, TransactionHeader};
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;

/// Supplies reference-block headers for new transactions.
pub trait HeaderProvider: Send + Sync {
    /// Returns headers whose expiration lies `expire_in_seconds` past the
    /// chain's current head time.
    fn get_headers(&self, expire_in_seconds: u32) -> BoxFuture<'_, EnuResult<TransactionHeader>>;
}

/// Fetches ABI documents by account name.
pub trait AbiProvider: Send + Sync {
    /// Returns the account's ABI as a JSON document.
    fn fetch_abi<'a>(&'a self, account: &'a str) -> BoxFuture<'a, EnuResult<Value>>;
}

/// Narrows candidate public keys to the set the chain requires.
pub trait RequiredKeysProvider: Send + Sync {
    /// Asks which of `available` must sign `transaction`.
    fn get_required_keys<'a>(
        &'a self,
        transaction: &'a Transaction,
        available: &'a [PublicKey],
    ) -> BoxFuture<'a, EnuResult<Vec<PublicKey>>>;
}

/// Sends signed transactions to the chain.
pub trait Broadcaster: Send + Sync {
    /// Pushes the transaction. Never retried; a timed-out push may still
    /// have reached the chain.
    fn broadcast<'a>(
        &'a self,
        transaction: &'a SignedTransaction,
    ) -> BoxFuture<'a, EnuResult<PushedTransaction>>;
}

/// A [`HeaderProvider`] that always answers with fixed headers, for offline
/// assembly against known reference blocks.
#[derive(Debug, Clone)]
pub struct StaticHeaders(pub TransactionHeader);

impl HeaderProvider for StaticHeaders {
    fn get_headers(&self, _expire_in_seconds: u32) -> BoxFuture<'_, EnuResult<TransactionHeader>> {
        future::ready(Ok(self.0.clone())).boxed()
    }
}
