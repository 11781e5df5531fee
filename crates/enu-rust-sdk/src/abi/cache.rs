//! Per-account ABI cache with de-duplicated fetches.

use super::types::Abi;
use crate::api::provider::AbiProvider;
use crate::error::{EnuError, EnuResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// A caller-supplied ABI document, not yet validated.
#[derive(Debug, Clone)]
pub enum RawAbi {
    /// A parsed JSON document.
    Json(Value),
    /// Raw JSON bytes.
    Bytes(Vec<u8>),
}

impl From<Value> for RawAbi {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for RawAbi {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Caches validated ABIs by account name.
///
/// Lookups are synchronous; fetches go through the configured
/// [`AbiProvider`] and are de-duplicated so concurrent requests for the same
/// account trigger at most one network round trip.
pub struct AbiCache {
    provider: Option<Arc<dyn AbiProvider>>,
    entries: Mutex<HashMap<String, Arc<Abi>>>,
    fetch_gates: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl fmt::Debug for AbiCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbiCache")
            .field("has_provider", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

impl AbiCache {
    /// Creates a cache backed by an optional fetch provider.
    ///
    /// Without a provider the cache only serves what callers seed into it.
    pub fn new(provider: Option<Arc<dyn AbiProvider>>) -> Self {
        Self {
            provider,
            entries: Mutex::new(HashMap::new()),
            fetch_gates: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Synchronous lookup.
    ///
    /// With `raw` supplied, the document is validated, stored, and returned.
    /// Without it, a cache miss is [`EnuError::NotCached`] — this path never
    /// touches the network.
    pub fn abi(&self, account: &str, raw: Option<RawAbi>) -> EnuResult<Arc<Abi>> {
        if let Some(raw) = raw {
            let abi = Arc::new(match raw {
                RawAbi::Json(value) => Abi::from_value(account, &value)?,
                RawAbi::Bytes(bytes) => Abi::from_bytes(account, &bytes)?,
            });
            self.insert(account, Arc::clone(&abi));
            return Ok(abi);
        }
        self.cached(account)
            .ok_or_else(|| EnuError::NotCached(account.to_string()))
    }

    /// Returns the cached ABI without fetching.
    pub fn cached(&self, account: &str) -> Option<Arc<Abi>> {
        self.entries
            .lock()
            .expect("abi cache lock poisoned")
            .get(account)
            .cloned()
    }

    /// Asynchronous lookup, fetching through the provider on a miss.
    ///
    /// With `force_refresh` the cached entry is bypassed but only replaced
    /// once the fresh document validates, so a failed refresh never evicts a
    /// working ABI.
    pub async fn abi_async(&self, account: &str, force_refresh: bool) -> EnuResult<Arc<Abi>> {
        if !force_refresh {
            if let Some(abi) = self.cached(account) {
                return Ok(abi);
            }
        }
        let provider = self
            .provider
            .clone()
            .ok_or_else(|| EnuError::NotCached(account.to_string()))?;

        let gate = {
            let mut gates = self.fetch_gates.lock().await;
            Arc::clone(gates.entry(account.to_string()).or_default())
        };
        let _fetching = gate.lock().await;

        // another task may have fetched while we waited on the gate
        if !force_refresh {
            if let Some(abi) = self.cached(account) {
                return Ok(abi);
            }
        }

        tracing::debug!(account, force_refresh, "fetching abi");
        let document = provider.fetch_abi(account).await?;
        let abi = Arc::new(Abi::from_value(account, &document)?);
        self.insert(account, Arc::clone(&abi));
        Ok(abi)
    }

    fn insert(&self, account: &str, abi: Arc<Abi>) {
        self.entries
            .lock()
            .expect("abi cache lock poisoned")
            .insert(account.to_string(), abi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct CountingProvider {
        document: Value,
        calls: AtomicU32,
        delay: Duration,
    }

    impl CountingProvider {
        fn new(document: Value) -> Arc<Self> {
            Arc::new(Self {
                document,
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            })
        }

        fn slow(document: Value) -> Arc<Self> {
            Arc::new(Self {
                document,
                calls: AtomicU32::new(0),
                delay: Duration::from_millis(20),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AbiProvider for CountingProvider {
        fn fetch_abi<'a>(&'a self, _account: &'a str) -> BoxFuture<'a, EnuResult<Value>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                Ok(self.document.clone())
            })
        }
    }

    fn minimal_abi() -> Value {
        json!({
            "structs": [
                {"name": "transfer", "fields": [{"name": "from", "type": "name"}]}
            ],
            "actions": [{"name": "transfer", "type": "transfer"}]
        })
    }

    #[test]
    fn test_sync_miss_is_not_cached_error() {
        let cache = AbiCache::new(None);
        let err = cache.abi("enu.msig", None).unwrap_err();
        assert!(matches!(err, EnuError::NotCached(_)));
        assert!(err.to_string().contains("enu.msig"));
    }

    #[test]
    fn test_raw_seed_then_lookup() {
        let cache = AbiCache::new(None);
        cache
            .abi("enu.token", Some(RawAbi::Json(minimal_abi())))
            .unwrap();
        let abi = cache.abi("enu.token", None).unwrap();
        assert!(abi.has_action("transfer"));
    }

    #[test]
    fn test_invalid_raw_is_rejected_and_not_stored() {
        let cache = AbiCache::new(None);
        let bad = json!({"structs": [], "actions": [{"name": "x", "type": "x"}]});
        assert!(cache.abi("currency", Some(RawAbi::Json(bad))).is_err());
        assert!(matches!(
            cache.abi("currency", None),
            Err(EnuError::NotCached(_))
        ));
    }

    #[tokio::test]
    async fn test_async_fetch_is_cached() {
        let provider = CountingProvider::new(minimal_abi());
        let cache = AbiCache::new(Some(provider.clone() as Arc<dyn AbiProvider>));

        cache.abi_async("enu.token", false).await.unwrap();
        cache.abi_async("enu.token", false).await.unwrap();
        assert_eq!(provider.calls(), 1);

        // the fetched entry also serves the synchronous path
        assert!(cache.abi("enu.token", None).is_ok());
    }

    #[tokio::test]
    async fn test_force_refresh_refetches() {
        let provider = CountingProvider::new(minimal_abi());
        let cache = AbiCache::new(Some(provider.clone() as Arc<dyn AbiProvider>));

        cache.abi_async("enu.token", false).await.unwrap();
        cache.abi_async("enu.token", true).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_are_deduplicated() {
        let provider = CountingProvider::slow(minimal_abi());
        let cache = AbiCache::new(Some(provider.clone() as Arc<dyn AbiProvider>));

        let (a, b) = tokio::join!(
            cache.abi_async("enu.token", false),
            cache.abi_async("enu.token", false)
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_entry() {
        struct FlippingProvider {
            calls: AtomicU32,
        }
        impl AbiProvider for FlippingProvider {
            fn fetch_abi<'a>(&'a self, _account: &'a str) -> BoxFuture<'a, EnuResult<Value>> {
                Box::pin(async move {
                    if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Ok(json!({
                            "structs": [{"name": "transfer", "fields": []}],
                            "actions": [{"name": "transfer", "type": "transfer"}]
                        }))
                    } else {
                        Ok(json!({"actions": [{"name": "x", "type": "missing"}]}))
                    }
                })
            }
        }

        let provider = Arc::new(FlippingProvider {
            calls: AtomicU32::new(0),
        });
        let cache = AbiCache::new(Some(provider as Arc<dyn AbiProvider>));

        cache.abi_async("enu.token", false).await.unwrap();
        assert!(cache.abi_async("enu.token", true).await.is_err());
        // the bad document did not evict the good one
        assert!(cache.abi("enu.token", None).is_ok());
    }
}
