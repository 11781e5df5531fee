//! The client tying configuration, node access, ABIs, and signing into the
//! transaction pipeline.

use crate::abi::{encode_action_data, Abi, AbiCache, RawAbi};
use crate::api::node::NodeClient;
use crate::api::provider::{AbiProvider, RequiredKeysProvider};
use crate::config::{EnuConfig, MockMode, TxOptions};
use crate::crypto::Signature;
use crate::error::{EnuError, EnuResult};
use crate::keys::{negotiate_keys, sign_transaction, KeyProvider, SignRequest};
use crate::transaction::{
    resolve_authorization, Action, ActionData, Contract, SignedTransaction, StagedAction,
    StagingTransaction, Transaction, TransactionBuilder, TransactionHeader, TransactionIntent,
};
use crate::types::Name;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The outcome of a processed transaction.
#[derive(Debug, Clone)]
pub struct TransactionResult {
    /// The transaction id, the digest of the packed transaction.
    pub transaction_id: String,
    /// Whether the transaction actually went out over the network.
    pub broadcast: bool,
    /// Whether broadcasting was mocked.
    pub mock: bool,
    /// The assembled transaction with its signatures.
    pub transaction: SignedTransaction,
    /// The node's execution receipt, when one came back.
    pub processed: Option<Value>,
}

/// The chain client.
///
/// Wraps an [`EnuConfig`], an optional [`NodeClient`], and an [`AbiCache`];
/// every transaction entry point funnels into one pipeline: resolve
/// authorization, encode payloads, fill headers, sign, broadcast.
#[derive(Debug, Clone)]
pub struct Enu {
    config: EnuConfig,
    node: Option<Arc<NodeClient>>,
    abi_cache: Arc<AbiCache>,
}

impl Enu {
    /// Creates a client.
    ///
    /// A node client is built only when the configuration has an endpoint;
    /// without one the client works offline against seeded ABIs and pinned
    /// or provided headers.
    pub fn new(config: EnuConfig) -> EnuResult<Self> {
        let node = match config.endpoint() {
            Some(_) => Some(Arc::new(NodeClient::new(&config)?)),
            None => None,
        };
        let abi_cache = Arc::new(AbiCache::new(
            node.clone().map(|n| n as Arc<dyn AbiProvider>),
        ));
        Ok(Self {
            config,
            node,
            abi_cache,
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &EnuConfig {
        &self.config
    }

    /// The node client, when an endpoint is configured.
    pub fn node(&self) -> Option<&Arc<NodeClient>> {
        self.node.as_ref()
    }

    /// The ABI cache.
    pub fn abi_cache(&self) -> &Arc<AbiCache> {
        &self.abi_cache
    }

    /// Synchronous ABI lookup; see [`AbiCache::abi`].
    pub fn abi(&self, account: &str, raw: Option<RawAbi>) -> EnuResult<Arc<Abi>> {
        self.abi_cache.abi(account, raw)
    }

    /// Asynchronous ABI lookup; see [`AbiCache::abi_async`].
    pub async fn abi_async(&self, account: &str, force_refresh: bool) -> EnuResult<Arc<Abi>> {
        self.abi_cache.abi_async(account, force_refresh).await
    }

    /// Returns a handle scoped to one contract, loading its ABI.
    pub async fn contract(&self, account: &str) -> EnuResult<Contract<'_>> {
        let name: Name = account.parse()?;
        let abi = self.abi_cache.abi_async(account, false).await?;
        Ok(Contract::new(self, name, abi))
    }

    /// The chain id signatures bind to.
    ///
    /// A pinned id wins; otherwise it comes from the node. Fully offline,
    /// signatures bind to a zero chain id.
    pub async fn chain_id(&self) -> EnuResult<[u8; 32]> {
        if let Some(id) = self.config.chain_id() {
            return Ok(id);
        }
        match &self.node {
            Some(node) => node.chain_id().await,
            None => Ok([0u8; 32]),
        }
    }

    /// Asks the chain which of `available` must sign `transaction`.
    pub async fn get_required_keys(
        &self,
        transaction: &Transaction,
        available: &[crate::crypto::PublicKey],
    ) -> EnuResult<Vec<crate::crypto::PublicKey>> {
        self.require_node()?.required_keys(transaction, available).await
    }

    /// Pushes an externally assembled signed transaction.
    pub async fn push_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> EnuResult<crate::api::response::PushedTransaction> {
        self.require_node()?.push_transaction(signed).await
    }

    fn require_node(&self) -> EnuResult<&Arc<NodeClient>> {
        self.node
            .as_ref()
            .ok_or_else(|| EnuError::Config("no endpoint configured".to_string()))
    }

    /// Processes a transaction given as data: actions plus header overrides.
    pub async fn transaction(
        &self,
        intent: TransactionIntent,
        options: TxOptions,
    ) -> EnuResult<TransactionResult> {
        let overrides = HeaderOverrides {
            delay_sec: intent.delay_sec,
            max_net_usage_words: intent.max_net_usage_words,
            max_cpu_usage_ms: intent.max_cpu_usage_ms,
            expire_in_seconds: intent.expire_in_seconds,
        };
        let staged = intent
            .actions
            .into_iter()
            .map(|action| StagedAction {
                action,
                authorization: None,
            })
            .collect();
        self.process(staged, intent.context_free_actions, overrides, options)
            .await
    }

    /// Runs a staging closure with no contracts declared and submits the
    /// result.
    ///
    /// The closure can still append prebuilt [`Action`]s; contract handles
    /// require [`transaction_contracts`](Self::transaction_contracts).
    pub async fn transaction_with<F>(
        &self,
        f: F,
        options: TxOptions,
    ) -> EnuResult<TransactionResult>
    where
        F: FnOnce(&mut StagingTransaction<'_>) -> EnuResult<()>,
    {
        self.stage_and_process(HashMap::new(), f, options).await
    }

    /// Loads the named contracts' ABIs, runs a staging closure with them
    /// declared, and submits the staged actions as one transaction.
    pub async fn transaction_contracts<F>(
        &self,
        accounts: &[&str],
        f: F,
        options: TxOptions,
    ) -> EnuResult<TransactionResult>
    where
        F: FnOnce(&mut StagingTransaction<'_>) -> EnuResult<()>,
    {
        let mut abis = HashMap::with_capacity(accounts.len());
        for account in accounts {
            let name: Name = account.parse()?;
            let abi = self.abi_cache.abi_async(account, false).await?;
            abis.insert(name, abi);
        }
        self.stage_and_process(abis, f, options).await
    }

    pub(crate) async fn push_actions(
        &self,
        actions: Vec<Action>,
        options: TxOptions,
    ) -> EnuResult<TransactionResult> {
        let staged = actions
            .into_iter()
            .map(|action| StagedAction {
                action,
                authorization: None,
            })
            .collect();
        self.process(staged, Vec::new(), HeaderOverrides::default(), options)
            .await
    }

    async fn stage_and_process<F>(
        &self,
        abis: HashMap<Name, Arc<Abi>>,
        f: F,
        options: TxOptions,
    ) -> EnuResult<TransactionResult>
    where
        F: FnOnce(&mut StagingTransaction<'_>) -> EnuResult<()>,
    {
        let mut builder = TransactionBuilder::new();
        builder.stage(&abis, f)?;
        let (staged, context_free) = builder.into_staged()?;
        self.process(staged, context_free, HeaderOverrides::default(), options)
            .await
    }

    async fn process(
        &self,
        staged: Vec<StagedAction>,
        context_free: Vec<Action>,
        overrides: HeaderOverrides,
        options: TxOptions,
    ) -> EnuResult<TransactionResult> {
        let mut actions = Vec::with_capacity(staged.len());
        for staged_action in staged {
            actions.push(self.finalize_action(staged_action, &options).await?);
        }
        let mut context_free_actions = Vec::with_capacity(context_free.len());
        for action in context_free {
            context_free_actions.push(self.encode_action(action).await?);
        }

        let expire = options
            .expire_in_seconds
            .or(overrides.expire_in_seconds)
            .unwrap_or_else(|| self.config.expire_in_seconds());
        let mut header = self.headers(expire).await?;
        if let Some(delay) = options
            .delay_sec
            .or(overrides.delay_sec)
            .or_else(|| self.config.delay_sec())
        {
            header.delay_sec = delay;
        }
        if let Some(words) = options
            .max_net_usage_words
            .or(overrides.max_net_usage_words)
            .or_else(|| self.config.max_net_usage_words())
        {
            header.max_net_usage_words = words;
        }
        if let Some(ms) = options
            .max_cpu_usage_ms
            .or(overrides.max_cpu_usage_ms)
            .or_else(|| self.config.max_cpu_usage_ms())
        {
            header.max_cpu_usage_ms = ms;
        }

        let transaction = Transaction {
            header,
            context_free_actions,
            actions,
            transaction_extensions: Vec::new(),
        };

        let sign = options.sign.unwrap_or_else(|| self.config.sign());
        // unsigned transactions never go out
        let broadcast = sign && options.broadcast.unwrap_or_else(|| self.config.broadcast());

        let signatures = if sign {
            self.sign(&transaction, &options).await?
        } else {
            Vec::new()
        };
        let signed = SignedTransaction {
            transaction,
            signatures,
        };
        let transaction_id = signed.transaction.id()?;

        if !broadcast {
            return Ok(TransactionResult {
                transaction_id,
                broadcast: false,
                mock: false,
                transaction: signed,
                processed: None,
            });
        }

        match self.config.mock_transactions() {
            Some(MockMode::Pass) => {
                tracing::debug!(%transaction_id, "mock broadcast accepted");
                return Ok(TransactionResult {
                    transaction_id,
                    broadcast: false,
                    mock: true,
                    transaction: signed,
                    processed: None,
                });
            }
            Some(MockMode::Fail) => {
                tracing::debug!(%transaction_id, "mock broadcast rejected");
                return Err(EnuError::MockFailure(transaction_id));
            }
            None => {}
        }

        let node = self
            .node
            .as_ref()
            .ok_or_else(|| EnuError::Config("broadcasting requires an endpoint".to_string()))?;
        let pushed = node.push_transaction(&signed).await?;
        Ok(TransactionResult {
            transaction_id: pushed.transaction_id,
            broadcast: true,
            mock: false,
            transaction: signed,
            processed: pushed.processed,
        })
    }

    async fn finalize_action(
        &self,
        staged: StagedAction,
        options: &TxOptions,
    ) -> EnuResult<Action> {
        let StagedAction {
            mut action,
            authorization,
        } = staged;

        let abi = self.abi_for(&action).await?;
        let specs = authorization
            .as_deref()
            .or(options.authorization.as_deref())
            .or_else(|| self.config.authorization());
        action.authorization = resolve_authorization(&action, specs, abi.as_deref())?;

        if let ActionData::Structured(data) = &action.data {
            let abi = abi
                .as_deref()
                .ok_or_else(|| EnuError::NotCached(action.account.to_string()))?;
            let bytes = encode_action_data(abi, &action.name.to_string(), data)?;
            action.data = ActionData::Hex(hex::encode(bytes));
        }
        Ok(action)
    }

    async fn encode_action(&self, mut action: Action) -> EnuResult<Action> {
        if let ActionData::Structured(data) = &action.data {
            let abi = self
                .abi_cache
                .abi_async(&action.account.to_string(), false)
                .await?;
            let bytes = encode_action_data(&abi, &action.name.to_string(), data)?;
            action.data = ActionData::Hex(hex::encode(bytes));
        }
        Ok(action)
    }

    async fn abi_for(&self, action: &Action) -> EnuResult<Option<Arc<Abi>>> {
        let account = action.account.to_string();
        if action.data.as_structured().is_some() {
            Ok(Some(self.abi_cache.abi_async(&account, false).await?))
        } else {
            Ok(self.abi_cache.cached(&account))
        }
    }

    async fn headers(&self, expire_in_seconds: u32) -> EnuResult<TransactionHeader> {
        if let Some(headers) = self.config.transaction_headers() {
            return Ok(headers.clone());
        }
        if let Some(provider) = self.config.header_provider() {
            return provider.get_headers(expire_in_seconds).await;
        }
        let node = self.node.as_ref().ok_or_else(|| {
            EnuError::Config(
                "transaction headers require an endpoint, pinned headers, or a header provider"
                    .to_string(),
            )
        })?;
        node.transaction_headers(expire_in_seconds).await
    }

    async fn sign(
        &self,
        transaction: &Transaction,
        options: &TxOptions,
    ) -> EnuResult<Vec<Signature>> {
        let chain_id = self.chain_id().await?;

        if let Some(provider) = self.config.sign_provider() {
            let buf = transaction.signing_message(&chain_id)?;
            return provider
                .sign(SignRequest {
                    buf: &buf,
                    transaction,
                    chain_id,
                })
                .await;
        }

        let key_provider: &dyn KeyProvider = options
            .key_provider
            .as_deref()
            .or_else(|| self.config.key_provider().map(|p| p.as_ref() as &dyn KeyProvider))
            .ok_or(EnuError::NoSigningKey)?;
        let required_keys = self
            .node
            .as_deref()
            .map(|n| n as &dyn RequiredKeysProvider);
        let keys = negotiate_keys(key_provider, required_keys, transaction).await?;
        sign_transaction(transaction, &chain_id, &keys)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct HeaderOverrides {
    delay_sec: Option<u32>,
    max_net_usage_words: Option<u32>,
    max_cpu_usage_ms: Option<u8>,
    expire_in_seconds: Option<u32>,
}
