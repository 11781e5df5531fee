//! Client configuration.

use crate::api::provider::HeaderProvider;
use crate::keys::{KeyProvider, SignProvider};
use crate::retry::RetryConfig;
use crate::transaction::{AuthSpec, TransactionHeader};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The public Enumivo mainnet API endpoint.
pub const MAINNET_URL: &str = "https://api.enumivo.org";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_EXPIRE_IN_SECONDS: u32 = 60;

/// How broadcasting behaves when transactions are mocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    /// Transactions complete locally with a real id and no network traffic.
    Pass,
    /// Transactions fail locally with a marked error, exercising the
    /// caller's failure path.
    Fail,
}

/// Configuration for an [`Enu`](crate::Enu) client.
///
/// Defaults to the offline preset: no endpoint, signing on, broadcasting on
/// (which then requires an endpoint at transaction time).
#[derive(Clone)]
pub struct EnuConfig {
    endpoint: Option<Url>,
    timeout: Duration,
    retry_config: RetryConfig,
    chain_id: Option<[u8; 32]>,
    expire_in_seconds: u32,
    sign: bool,
    broadcast: bool,
    mock_transactions: Option<MockMode>,
    authorization: Option<Vec<AuthSpec>>,
    transaction_headers: Option<TransactionHeader>,
    header_provider: Option<Arc<dyn HeaderProvider>>,
    key_provider: Option<Arc<dyn KeyProvider>>,
    sign_provider: Option<Arc<dyn SignProvider>>,
    delay_sec: Option<u32>,
    max_net_usage_words: Option<u32>,
    max_cpu_usage_ms: Option<u8>,
}

impl fmt::Debug for EnuConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnuConfig")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("retry_config", &self.retry_config)
            .field("chain_id", &self.chain_id.map(hex::encode))
            .field("expire_in_seconds", &self.expire_in_seconds)
            .field("sign", &self.sign)
            .field("broadcast", &self.broadcast)
            .field("mock_transactions", &self.mock_transactions)
            .field("authorization", &self.authorization)
            .field("transaction_headers", &self.transaction_headers)
            .field("has_header_provider", &self.header_provider.is_some())
            .field("has_key_provider", &self.key_provider.is_some())
            .field("has_sign_provider", &self.sign_provider.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for EnuConfig {
    fn default() -> Self {
        Self::offline()
    }
}

impl EnuConfig {
    /// Configuration for the public mainnet endpoint.
    pub fn mainnet() -> Self {
        Self {
            endpoint: Some(Url::parse(MAINNET_URL).expect("mainnet url is valid")),
            ..Self::offline()
        }
    }

    /// Configuration for a custom endpoint.
    pub fn custom(url: &str) -> crate::error::EnuResult<Self> {
        Ok(Self {
            endpoint: Some(Url::parse(url)?),
            ..Self::offline()
        })
    }

    /// Configuration with no endpoint at all.
    ///
    /// Assembly and signing work locally; anything needing the chain
    /// (header fetch, ABI fetch, key narrowing, broadcast) must be supplied
    /// through providers or turned off.
    pub fn offline() -> Self {
        Self {
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            retry_config: RetryConfig::default(),
            chain_id: None,
            expire_in_seconds: DEFAULT_EXPIRE_IN_SECONDS,
            sign: true,
            broadcast: true,
            mock_transactions: None,
            authorization: None,
            transaction_headers: None,
            header_provider: None,
            key_provider: None,
            sign_provider: None,
            delay_sec: None,
            max_net_usage_words: None,
            max_cpu_usage_ms: None,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry behavior for read requests.
    pub fn with_retry(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Disables retry entirely.
    pub fn without_retry(mut self) -> Self {
        self.retry_config = RetryConfig::no_retry();
        self
    }

    /// Pins the chain id instead of fetching it from the node.
    pub fn with_chain_id(mut self, chain_id: [u8; 32]) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Pins the chain id from its hex form.
    pub fn with_chain_id_hex(mut self, chain_id: &str) -> crate::error::EnuResult<Self> {
        let bytes: [u8; 32] = hex::decode(chain_id)?
            .try_into()
            .map_err(|_| crate::error::EnuError::Config("chain id is not 32 bytes".to_string()))?;
        self.chain_id = Some(bytes);
        Ok(self)
    }

    /// Sets how far past head time transactions expire.
    pub fn with_expire_in_seconds(mut self, seconds: u32) -> Self {
        self.expire_in_seconds = seconds;
        self
    }

    /// Turns signing on or off for all transactions.
    pub fn with_sign(mut self, sign: bool) -> Self {
        self.sign = sign;
        self
    }

    /// Turns broadcasting on or off for all transactions.
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Mocks broadcasting: transactions complete or fail locally without
    /// touching the network.
    pub fn with_mock_transactions(mut self, mode: MockMode) -> Self {
        self.mock_transactions = Some(mode);
        self
    }

    /// Sets the default authorization applied to actions that carry none.
    pub fn with_authorization(mut self, authorization: Vec<AuthSpec>) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Pins transaction headers, skipping the reference-block fetch.
    pub fn with_transaction_headers(mut self, headers: TransactionHeader) -> Self {
        self.transaction_headers = Some(headers);
        self
    }

    /// Supplies headers through a callback instead of the node.
    pub fn with_header_provider(mut self, provider: Arc<dyn HeaderProvider>) -> Self {
        self.header_provider = Some(provider);
        self
    }

    /// Sets the default key provider.
    pub fn with_key_provider(mut self, provider: Arc<dyn KeyProvider>) -> Self {
        self.key_provider = Some(provider);
        self
    }

    /// Replaces the whole signing step with a custom provider.
    pub fn with_sign_provider(mut self, provider: Arc<dyn SignProvider>) -> Self {
        self.sign_provider = Some(provider);
        self
    }

    /// Sets the default execution delay in seconds.
    pub fn with_delay_sec(mut self, delay_sec: u32) -> Self {
        self.delay_sec = Some(delay_sec);
        self
    }

    /// Caps net usage, in 8-byte words.
    pub fn with_max_net_usage_words(mut self, words: u32) -> Self {
        self.max_net_usage_words = Some(words);
        self
    }

    /// Caps cpu usage, in milliseconds.
    pub fn with_max_cpu_usage_ms(mut self, ms: u8) -> Self {
        self.max_cpu_usage_ms = Some(ms);
        self
    }

    /// Returns the configured endpoint, if any.
    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the retry configuration.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    /// Returns the pinned chain id, if any.
    pub fn chain_id(&self) -> Option<[u8; 32]> {
        self.chain_id
    }

    /// Returns the default expiration window.
    pub fn expire_in_seconds(&self) -> u32 {
        self.expire_in_seconds
    }

    /// Whether transactions are signed by default.
    pub fn sign(&self) -> bool {
        self.sign
    }

    /// Whether transactions are broadcast by default.
    pub fn broadcast(&self) -> bool {
        self.broadcast
    }

    /// Returns the mock mode, if mocking is on.
    pub fn mock_transactions(&self) -> Option<MockMode> {
        self.mock_transactions
    }

    /// Returns the default authorization specs, if any.
    pub fn authorization(&self) -> Option<&[AuthSpec]> {
        self.authorization.as_deref()
    }

    /// Returns pinned transaction headers, if any.
    pub fn transaction_headers(&self) -> Option<&TransactionHeader> {
        self.transaction_headers.as_ref()
    }

    /// Returns the header provider, if any.
    pub fn header_provider(&self) -> Option<&Arc<dyn HeaderProvider>> {
        self.header_provider.as_ref()
    }

    /// Returns the default key provider, if any.
    pub fn key_provider(&self) -> Option<&Arc<dyn KeyProvider>> {
        self.key_provider.as_ref()
    }

    /// Returns the sign provider, if any.
    pub fn sign_provider(&self) -> Option<&Arc<dyn SignProvider>> {
        self.sign_provider.as_ref()
    }

    /// Returns the default execution delay, if any.
    pub fn delay_sec(&self) -> Option<u32> {
        self.delay_sec
    }

    /// Returns the net usage cap, if any.
    pub fn max_net_usage_words(&self) -> Option<u32> {
        self.max_net_usage_words
    }

    /// Returns the cpu usage cap, if any.
    pub fn max_cpu_usage_ms(&self) -> Option<u8> {
        self.max_cpu_usage_ms
    }
}

/// Per-call options that override the configuration for one transaction.
#[derive(Clone, Default)]
pub struct TxOptions {
    /// Overrides [`EnuConfig::sign`] for this transaction.
    pub sign: Option<bool>,
    /// Overrides [`EnuConfig::broadcast`] for this transaction.
    pub broadcast: Option<bool>,
    /// Authorization applied to this call's actions that carry none.
    pub authorization: Option<Vec<AuthSpec>>,
    /// Overrides the execution delay.
    pub delay_sec: Option<u32>,
    /// Overrides the net usage cap.
    pub max_net_usage_words: Option<u32>,
    /// Overrides the cpu usage cap.
    pub max_cpu_usage_ms: Option<u8>,
    /// Overrides the expiration window.
    pub expire_in_seconds: Option<u32>,
    /// Overrides the key provider.
    pub key_provider: Option<Arc<dyn KeyProvider>>,
}

impl fmt::Debug for TxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxOptions")
            .field("sign", &self.sign)
            .field("broadcast", &self.broadcast)
            .field("authorization", &self.authorization)
            .field("delay_sec", &self.delay_sec)
            .field("max_net_usage_words", &self.max_net_usage_words)
            .field("max_cpu_usage_ms", &self.max_cpu_usage_ms)
            .field("expire_in_seconds", &self.expire_in_seconds)
            .field("has_key_provider", &self.key_provider.is_some())
            .finish()
    }
}

impl TxOptions {
    /// Overrides signing for this transaction.
    pub fn with_sign(mut self, sign: bool) -> Self {
        self.sign = Some(sign);
        self
    }

    /// Overrides broadcasting for this transaction.
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    /// Sets the call-level authorization.
    pub fn with_authorization(mut self, authorization: Vec<AuthSpec>) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Overrides the execution delay.
    pub fn with_delay_sec(mut self, delay_sec: u32) -> Self {
        self.delay_sec = Some(delay_sec);
        self
    }

    /// Overrides the net usage cap.
    pub fn with_max_net_usage_words(mut self, words: u32) -> Self {
        self.max_net_usage_words = Some(words);
        self
    }

    /// Overrides the cpu usage cap.
    pub fn with_max_cpu_usage_ms(mut self, ms: u8) -> Self {
        self.max_cpu_usage_ms = Some(ms);
        self
    }

    /// Overrides the expiration window.
    pub fn with_expire_in_seconds(mut self, seconds: u32) -> Self {
        self.expire_in_seconds = Some(seconds);
        self
    }

    /// Overrides the key provider.
    pub fn with_key_provider(mut self, provider: Arc<dyn KeyProvider>) -> Self {
        self.key_provider = Some(provider);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_offline() {
        let config = EnuConfig::default();
        assert!(config.endpoint().is_none());
        assert!(config.sign());
        assert!(config.broadcast());
        assert_eq!(config.expire_in_seconds(), 60);
        assert!(config.mock_transactions().is_none());
    }

    #[test]
    fn test_mainnet_endpoint() {
        let config = EnuConfig::mainnet();
        assert_eq!(config.endpoint().unwrap().as_str(), "https://api.enumivo.org/");
    }

    #[test]
    fn test_custom_rejects_bad_urls() {
        assert!(EnuConfig::custom("not a url").is_err());
        assert!(EnuConfig::custom("http://127.0.0.1:8888").is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = EnuConfig::offline()
            .with_sign(false)
            .with_broadcast(false)
            .with_expire_in_seconds(120)
            .with_delay_sec(369)
            .with_mock_transactions(MockMode::Fail);
        assert!(!config.sign());
        assert!(!config.broadcast());
        assert_eq!(config.expire_in_seconds(), 120);
        assert_eq!(config.delay_sec(), Some(369));
        assert_eq!(config.mock_transactions(), Some(MockMode::Fail));
    }

    #[test]
    fn test_chain_id_hex() {
        let config = EnuConfig::offline()
            .with_chain_id_hex("cf057bbfb72640471fd910bcb67639c22df9f92470936cddc1ade0e2f2e7dc4f")
            .unwrap();
        assert_eq!(config.chain_id().unwrap()[0], 0xcf);
        assert!(EnuConfig::offline().with_chain_id_hex("beef").is_err());
    }
}
