//! Signing: the default digest signer and the custom sign-provider
//! boundary.

use crate::crypto::{sha256, PrivateKey, Signature};
use crate::error::EnuResult;
use crate::transaction::Transaction;
use futures::future::BoxFuture;

/// What a custom sign provider receives.
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    /// The exact byte string to sign: chain id, packed transaction, and the
    /// context-free data digest.
    pub buf: &'a [u8],
    /// The transaction the bytes were derived from, for inspection.
    pub transaction: &'a Transaction,
    /// The chain id the bytes embed.
    pub chain_id: [u8; 32],
}

/// Produces signatures for a transaction, replacing key negotiation
/// entirely.
pub trait SignProvider: Send + Sync {
    /// Signs the request, returning signatures in the order they should be
    /// attached.
    fn sign<'a>(&'a self, request: SignRequest<'a>) -> BoxFuture<'a, EnuResult<Vec<Signature>>>;
}

/// Adapts a synchronous closure into a [`SignProvider`].
pub struct SignProviderFn<F>(pub F);

impl<F> SignProvider for SignProviderFn<F>
where
    F: for<'a> Fn(SignRequest<'a>) -> EnuResult<Vec<Signature>> + Send + Sync,
{
    fn sign<'a>(&'a self, request: SignRequest<'a>) -> BoxFuture<'a, EnuResult<Vec<Signature>>> {
        use futures::FutureExt;
        futures::future::ready((self.0)(request)).boxed()
    }
}

/// Signs a raw byte string with one key: the helper custom providers use.
pub fn sign(buf: &[u8], key: &PrivateKey) -> Signature {
    Signature::sign_digest(&sha256(buf), key)
}

/// Signs a transaction with each key, in key order.
pub fn sign_transaction(
    transaction: &Transaction,
    chain_id: &[u8; 32],
    keys: &[PrivateKey],
) -> EnuResult<Vec<Signature>> {
    let digest = transaction.signing_digest(chain_id)?;
    Ok(keys
        .iter()
        .map(|key| Signature::sign_digest(&digest, key))
        .collect())
}
