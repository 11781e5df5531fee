//! The key provider boundary.
//!
//! A [`KeyProvider`] answers "which keys may sign this transaction". It is
//! queried up to twice: once with no candidate set, and, if it answered with
//! public keys, once more with the chain-narrowed set of required keys. See
//! [`negotiate_keys`](super::negotiate_keys).

use crate::crypto::{PrivateKey, PublicKey};
use crate::error::EnuResult;
use crate::transaction::Transaction;
use futures::future::{self, BoxFuture, FutureExt};

/// What the negotiator asks a provider.
#[derive(Debug, Clone, Copy)]
pub struct KeyQuery<'a> {
    /// The transaction about to be signed.
    pub transaction: &'a Transaction,
    /// On the second round, the public keys the chain says are required.
    pub pubkeys: Option<&'a [PublicKey]>,
}

/// A key as returned by a provider.
#[derive(Debug, Clone)]
pub enum ProvidedKey {
    /// A private key, usable for signing directly.
    Private(PrivateKey),
    /// A public key, to be narrowed through the chain before the second
    /// round.
    Public(PublicKey),
}

/// Supplies candidate keys for signing.
pub trait KeyProvider: Send + Sync {
    /// Answers a negotiation round.
    fn provide<'a>(&'a self, query: KeyQuery<'a>) -> BoxFuture<'a, EnuResult<Vec<ProvidedKey>>>;
}

impl KeyProvider for PrivateKey {
    fn provide<'a>(&'a self, _query: KeyQuery<'a>) -> BoxFuture<'a, EnuResult<Vec<ProvidedKey>>> {
        future::ready(Ok(vec![ProvidedKey::Private(self.clone())])).boxed()
    }
}

impl KeyProvider for Vec<PrivateKey> {
    fn provide<'a>(&'a self, _query: KeyQuery<'a>) -> BoxFuture<'a, EnuResult<Vec<ProvidedKey>>> {
        future::ready(Ok(self
            .iter()
            .cloned()
            .map(ProvidedKey::Private)
            .collect()))
        .boxed()
    }
}

/// Adapts a synchronous closure into a [`KeyProvider`].
pub struct KeyProviderFn<F>(pub F);

impl<F> KeyProvider for KeyProviderFn<F>
where
    F: for<'a> Fn(KeyQuery<'a>) -> EnuResult<Vec<ProvidedKey>> + Send + Sync,
{
    fn provide<'a>(&'a self, query: KeyQuery<'a>) -> BoxFuture<'a, EnuResult<Vec<ProvidedKey>>> {
        future::ready((self.0)(query)).boxed()
    }
}
