//! Two-phase key negotiation.
//!
//! Round one asks the provider for keys with no candidate set. Private keys
//! short-circuit; public keys are narrowed to the chain's required set via
//! the required-keys service, and the provider is asked once more for the
//! private halves of exactly that set.

use super::provider::{KeyProvider, KeyQuery, ProvidedKey};
use crate::api::provider::RequiredKeysProvider;
use crate::crypto::{PrivateKey, PublicKey};
use crate::error::{EnuError, EnuResult};
use crate::transaction::{PermissionLevel, Transaction};

/// The distinct permission levels a transaction exercises, in first-use
/// order.
pub fn authorization_requirements(transaction: &Transaction) -> Vec<PermissionLevel> {
    let mut requirements: Vec<PermissionLevel> = Vec::new();
    for action in &transaction.actions {
        for level in &action.authorization {
            if !requirements.contains(level) {
                requirements.push(level.clone());
            }
        }
    }
    requirements
}

/// Resolves the private keys that will sign `transaction`.
///
/// `required_keys` may be absent for offline use; it is only consulted when
/// the provider answers with public keys. Ending any path without at least
/// one private key is [`EnuError::NoSigningKey`].
pub async fn negotiate_keys(
    provider: &dyn KeyProvider,
    required_keys: Option<&dyn RequiredKeysProvider>,
    transaction: &Transaction,
) -> EnuResult<Vec<PrivateKey>> {
    let first = provider
        .provide(KeyQuery {
            transaction,
            pubkeys: None,
        })
        .await?;
    let (privates, publics) = partition(first);
    if !privates.is_empty() {
        // the provider already committed to concrete keys
        return Ok(privates);
    }
    if publics.is_empty() {
        return Err(EnuError::NoSigningKey);
    }

    tracing::debug!(
        candidates = publics.len(),
        requirements = authorization_requirements(transaction).len(),
        "narrowing candidate keys"
    );
    let service = required_keys.ok_or_else(|| {
        EnuError::Config("narrowing public keys requires a required-keys service".to_string())
    })?;
    let required = service.get_required_keys(transaction, &publics).await?;
    if required.is_empty() {
        return Err(EnuError::NoSigningKey);
    }

    let second = provider
        .provide(KeyQuery {
            transaction,
            pubkeys: Some(&required),
        })
        .await?;
    let (privates, _) = partition(second);
    if privates.is_empty() {
        return Err(EnuError::NoSigningKey);
    }
    Ok(privates)
}

fn partition(provided: Vec<ProvidedKey>) -> (Vec<PrivateKey>, Vec<PublicKey>) {
    let mut privates = Vec::new();
    let mut publics = Vec::new();
    for key in provided {
        match key {
            ProvidedKey::Private(k) => privates.push(k),
            ProvidedKey::Public(k) => publics.push(k),
        }
    }
    (privates, publics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::provider::KeyProviderFn;
    use crate::transaction::{Action, PermissionLevel, Transaction, TransactionHeader};
    use futures::future::{self, BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn transaction_with_auth(levels: &[(&str, &str)]) -> Transaction {
        let authorization = levels
            .iter()
            .map(|(a, p)| PermissionLevel::new(a, p).unwrap())
            .collect();
        Transaction {
            header: TransactionHeader::default(),
            context_free_actions: vec![],
            actions: vec![Action::hex("enu.token", "transfer", "00")
                .unwrap()
                .with_authorization(authorization)],
            transaction_extensions: vec![],
        }
    }

    struct StaticRequired(Vec<PublicKey>);

    impl RequiredKeysProvider for StaticRequired {
        fn get_required_keys<'a>(
            &'a self,
            _transaction: &'a Transaction,
            available: &'a [PublicKey],
        ) -> BoxFuture<'a, EnuResult<Vec<PublicKey>>> {
            let required = self
                .0
                .iter()
                .filter(|k| available.contains(k))
                .cloned()
                .collect();
            future::ready(Ok(required)).boxed()
        }
    }

    #[test]
    fn test_authorization_requirements_deduplicate_in_order() {
        let tx = Transaction {
            header: TransactionHeader::default(),
            context_free_actions: vec![],
            actions: vec![
                Action::hex("enu.token", "transfer", "00")
                    .unwrap()
                    .with_authorization(vec![
                        PermissionLevel::new("initb", "active").unwrap(),
                        PermissionLevel::new("inita", "active").unwrap(),
                    ]),
                Action::hex("currency", "transfer", "00")
                    .unwrap()
                    .with_authorization(vec![PermissionLevel::new("initb", "active").unwrap()]),
            ],
            transaction_extensions: vec![],
        };
        let requirements = authorization_requirements(&tx);
        let strings: Vec<String> = requirements.iter().map(ToString::to_string).collect();
        assert_eq!(strings, vec!["initb@active", "inita@active"]);
    }

    #[tokio::test]
    async fn test_private_keys_short_circuit() {
        let key = PrivateKey::seed_private("key1").unwrap();
        let tx = transaction_with_auth(&[("inita", "active")]);
        // no required-keys service is needed on this path
        let keys = negotiate_keys(&key, None, &tx).await.unwrap();
        assert_eq!(keys, vec![PrivateKey::seed_private("key1").unwrap()]);
    }

    #[tokio::test]
    async fn test_two_phase_narrows_to_required_keys() {
        let key1 = PrivateKey::seed_private("key1").unwrap();
        let key2 = PrivateKey::seed_private("key2").unwrap();
        let pub1 = key1.public_key();
        let pub2 = key2.public_key();

        let rounds = Arc::new(AtomicU32::new(0));
        let seen_pubkeys: Arc<Mutex<Option<Vec<PublicKey>>>> = Arc::new(Mutex::new(None));
        let provider = {
            let key1 = key1.clone();
            let (pub1, pub2) = (pub1.clone(), pub2.clone());
            let rounds = Arc::clone(&rounds);
            let seen_pubkeys = Arc::clone(&seen_pubkeys);
            KeyProviderFn(move |query: KeyQuery<'_>| {
                rounds.fetch_add(1, Ordering::SeqCst);
                match query.pubkeys {
                    None => Ok(vec![
                        ProvidedKey::Public(pub1.clone()),
                        ProvidedKey::Public(pub2.clone()),
                    ]),
                    Some(required) => {
                        *seen_pubkeys.lock().unwrap() = Some(required.to_vec());
                        Ok(required
                            .iter()
                            .filter(|k| **k == key1.public_key())
                            .map(|_| ProvidedKey::Private(key1.clone()))
                            .collect())
                    }
                }
            })
        };

        let service = StaticRequired(vec![pub1.clone()]);
        let tx = transaction_with_auth(&[("inita", "active")]);
        let keys = negotiate_keys(&provider, Some(&service), &tx)
            .await
            .unwrap();
        assert_eq!(keys, vec![key1]);
        assert_eq!(rounds.load(Ordering::SeqCst), 2);
        // the second round saw only the chain-required key, not pub2
        assert_eq!(seen_pubkeys.lock().unwrap().as_deref(), Some(&[pub1][..]));
    }

    #[tokio::test]
    async fn test_no_keys_at_all() {
        let provider = KeyProviderFn(|_query: KeyQuery<'_>| Ok(vec![]));
        let tx = transaction_with_auth(&[("inita", "active")]);
        let err = negotiate_keys(&provider, None, &tx).await.unwrap_err();
        assert!(matches!(err, EnuError::NoSigningKey));
    }

    #[tokio::test]
    async fn test_chain_requires_none_of_the_candidates() {
        let pub1 = PrivateKey::seed_private("key1").unwrap().public_key();
        let provider =
            KeyProviderFn(move |_query: KeyQuery<'_>| Ok(vec![ProvidedKey::Public(pub1.clone())]));
        let service = StaticRequired(vec![]);
        let tx = transaction_with_auth(&[("inita", "active")]);
        let err = negotiate_keys(&provider, Some(&service), &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, EnuError::NoSigningKey));
    }

    #[tokio::test]
    async fn test_public_keys_without_a_service_is_a_config_error() {
        let pub1 = PrivateKey::seed_private("key1").unwrap().public_key();
        let provider =
            KeyProviderFn(move |_query: KeyQuery<'_>| Ok(vec![ProvidedKey::Public(pub1.clone())]));
        let tx = transaction_with_auth(&[("inita", "active")]);
        let err = negotiate_keys(&provider, None, &tx).await.unwrap_err();
        assert!(matches!(err, EnuError::Config(_)));
    }
}
