//! HTTP client for the `v1/chain` API.

use crate::api::provider::{AbiProvider, Broadcaster, HeaderProvider, RequiredKeysProvider};
use crate::api::response::{
    BlockInfo, ChainInfo, GetAbiResult, NodeErrorResponse, PushedTransaction,
    RequiredKeysResponse,
};
use crate::config::EnuConfig;
use crate::crypto::PublicKey;
use crate::error::{EnuError, EnuResult};
use crate::retry::{RetryConfig, RetryExecutor};
use crate::transaction::{SignedTransaction, Transaction, TransactionHeader};
use futures::future::BoxFuture;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Client for a chain node's `v1/chain` API.
///
/// Read requests retry transient failures per the configured
/// [`RetryConfig`]. [`push_transaction`](Self::push_transaction) is never
/// retried: a timed-out push may still have reached the chain, and pushing
/// again would double-execute.
#[derive(Debug)]
pub struct NodeClient {
    base_url: Url,
    client: Client,
    retry_config: RetryConfig,
    chain_id: OnceLock<[u8; 32]>,
}

impl NodeClient {
    /// Creates a client from the configuration's endpoint.
    ///
    /// Fails with [`EnuError::Config`] when no endpoint is configured.
    pub fn new(config: &EnuConfig) -> EnuResult<Self> {
        let base_url = config
            .endpoint()
            .cloned()
            .ok_or_else(|| EnuError::Config("no endpoint configured".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(EnuError::Http)?;

        let chain_id = OnceLock::new();
        if let Some(id) = config.chain_id() {
            let _ = chain_id.set(id);
        }

        Ok(Self {
            base_url,
            client,
            retry_config: config.retry_config().clone(),
            chain_id,
        })
    }

    /// Returns the node's base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Gets current chain state.
    pub async fn get_info(&self) -> EnuResult<ChainInfo> {
        let info: ChainInfo = self
            .post_json("get_info", Value::Object(Default::default()), true)
            .await?;
        if self.chain_id.get().is_none() {
            if let Ok(bytes) = info.chain_id_bytes() {
                let _ = self.chain_id.set(bytes);
            }
        }
        Ok(info)
    }

    /// Gets a block by number or id.
    pub async fn get_block(&self, block_num_or_id: &str) -> EnuResult<BlockInfo> {
        self.post_json(
            "get_block",
            serde_json::json!({ "block_num_or_id": block_num_or_id }),
            true,
        )
        .await
    }

    /// Gets an account's ABI.
    pub async fn get_abi(&self, account: &str) -> EnuResult<GetAbiResult> {
        self.post_json(
            "get_abi",
            serde_json::json!({ "account_name": account }),
            true,
        )
        .await
    }

    /// Asks which of `available` must sign `transaction`.
    pub async fn required_keys(
        &self,
        transaction: &Transaction,
        available: &[PublicKey],
    ) -> EnuResult<Vec<PublicKey>> {
        let response: RequiredKeysResponse = self
            .post_json(
                "get_required_keys",
                serde_json::json!({
                    "transaction": transaction,
                    "available_keys": available,
                }),
                true,
            )
            .await?;
        Ok(response.required_keys)
    }

    /// Pushes a signed transaction. Never retried.
    pub async fn push_transaction(
        &self,
        signed: &SignedTransaction,
    ) -> EnuResult<PushedTransaction> {
        let packed = signed.transaction.pack()?;
        let body = serde_json::json!({
            "signatures": signed.signatures,
            "compression": "none",
            "packed_context_free_data": "",
            "packed_trx": hex::encode(&packed),
        });
        self.post_json("push_transaction", body, false).await
    }

    /// The chain id, fetched once through `get_info` and cached.
    pub async fn chain_id(&self) -> EnuResult<[u8; 32]> {
        if let Some(id) = self.chain_id.get() {
            return Ok(*id);
        }
        let info = self.get_info().await?;
        let bytes = info.chain_id_bytes()?;
        Ok(*self.chain_id.get_or_init(|| bytes))
    }

    /// Builds headers referencing the last irreversible block, expiring
    /// `expire_in_seconds` past head time.
    pub async fn transaction_headers(
        &self,
        expire_in_seconds: u32,
    ) -> EnuResult<TransactionHeader> {
        let info = self.get_info().await?;
        let block = self
            .get_block(&info.last_irreversible_block_num.to_string())
            .await?;
        Ok(TransactionHeader {
            expiration: info.head_block_time.plus_secs(expire_in_seconds),
            ref_block_num: (block.block_num & 0xffff) as u16,
            ref_block_prefix: block.ref_block_prefix,
            max_net_usage_words: 0,
            max_cpu_usage_ms: 0,
            delay_sec: 0,
        })
    }

    fn build_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        url.set_path(&format!("{}v1/chain/{}", url.path(), path));
        url
    }

    async fn post_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        path: &str,
        body: Value,
        retry: bool,
    ) -> EnuResult<T> {
        let url = self.build_url(path);
        if !retry {
            return Self::send(self.client.clone(), url, body).await;
        }

        let executor = RetryExecutor::new(self.retry_config.clone());
        executor
            .execute(|| {
                let client = self.client.clone();
                let url = url.clone();
                let body = body.clone();
                async move { Self::send(client, url, body).await }
            })
            .await
    }

    async fn send<T: for<'de> serde::Deserialize<'de>>(
        client: Client,
        url: Url,
        body: Value,
    ) -> EnuResult<T> {
        let response = client
            .post(url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .json(&body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: for<'de> serde::Deserialize<'de>>(
        response: reqwest::Response,
    ) -> EnuResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: Value = response.json().await.unwrap_or_default();
        match serde_json::from_value::<NodeErrorResponse>(body) {
            Ok(parsed) => Err(EnuError::api_with_code(
                status.as_u16(),
                parsed.best_message(),
                parsed.chain_error_code(),
            )),
            Err(_) => Err(EnuError::api(status.as_u16(), "unknown error")),
        }
    }
}

impl HeaderProvider for NodeClient {
    fn get_headers(&self, expire_in_seconds: u32) -> BoxFuture<'_, EnuResult<TransactionHeader>> {
        Box::pin(self.transaction_headers(expire_in_seconds))
    }
}

impl AbiProvider for NodeClient {
    fn fetch_abi<'a>(&'a self, account: &'a str) -> BoxFuture<'a, EnuResult<Value>> {
        Box::pin(async move {
            let result = self.get_abi(account).await?;
            result
                .abi
                .ok_or_else(|| EnuError::api(404, format!("account {account} has no abi")))
        })
    }
}

impl RequiredKeysProvider for NodeClient {
    fn get_required_keys<'a>(
        &'a self,
        transaction: &'a Transaction,
        available: &'a [PublicKey],
    ) -> BoxFuture<'a, EnuResult<Vec<PublicKey>>> {
        Box::pin(self.required_keys(transaction, available))
    }
}

impl Broadcaster for NodeClient {
    fn broadcast<'a>(
        &'a self,
        transaction: &'a SignedTransaction,
    ) -> BoxFuture<'a, EnuResult<PushedTransaction>> {
        Box::pin(self.push_transaction(transaction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use crate::transaction::{Action, PermissionLevel, TransactionHeader};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_client(server: &MockServer) -> NodeClient {
        let config = EnuConfig::custom(&server.uri()).unwrap().without_retry();
        NodeClient::new(&config).unwrap()
    }

    fn info_body() -> Value {
        json!({
            "server_version": "deadbeef",
            "chain_id": "cf057bbfb72640471fd910bcb67639c22df9f92470936cddc1ade0e2f2e7dc4f",
            "head_block_num": 1000,
            "last_irreversible_block_num": 999,
            "head_block_id": "000003e8000000000000000000000000000000000000000000000000000000aa",
            "head_block_time": "2018-06-01T00:00:00",
            "head_block_producer": "enumivo"
        })
    }

    fn signed_transaction() -> SignedTransaction {
        SignedTransaction {
            transaction: Transaction {
                header: TransactionHeader::default(),
                context_free_actions: vec![],
                actions: vec![Action::hex("enu.token", "transfer", "00")
                    .unwrap()
                    .with_authorization(vec![PermissionLevel::new("inita", "active").unwrap()])],
                transaction_extensions: vec![],
            },
            signatures: vec![],
        }
    }

    #[test]
    fn test_build_url() {
        let config = EnuConfig::custom("http://127.0.0.1:8888").unwrap();
        let client = NodeClient::new(&config).unwrap();
        assert_eq!(
            client.build_url("get_info").as_str(),
            "http://127.0.0.1:8888/v1/chain/get_info"
        );
    }

    #[test]
    fn test_new_requires_an_endpoint() {
        let err = NodeClient::new(&EnuConfig::offline()).unwrap_err();
        assert!(matches!(err, EnuError::Config(_)));
    }

    #[tokio::test]
    async fn test_get_info() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/get_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let info = client.get_info().await.unwrap();
        assert_eq!(info.head_block_num, 1000);
        assert_eq!(info.head_block_time.secs(), 1_527_811_200);
    }

    #[tokio::test]
    async fn test_chain_id_is_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/get_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let first = client.chain_id().await.unwrap();
        let second = client.chain_id().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], 0xcf);
    }

    #[tokio::test]
    async fn test_pinned_chain_id_skips_the_network() {
        let server = MockServer::start().await;
        // no get_info mock mounted: any request would 404

        let config = EnuConfig::custom(&server.uri())
            .unwrap()
            .with_chain_id([7u8; 32]);
        let client = NodeClient::new(&config).unwrap();
        assert_eq!(client.chain_id().await.unwrap(), [7u8; 32]);
    }

    #[tokio::test]
    async fn test_transaction_headers_reference_the_irreversible_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/get_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/get_block"))
            .and(body_partial_json(json!({"block_num_or_id": "999"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "block_num": 999,
                "id": "000003e7000000000000000000000000000000000000000000000000000000bb",
                "timestamp": "2018-05-31T23:59:59",
                "ref_block_prefix": 452435776u32
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let headers = client.transaction_headers(60).await.unwrap();
        assert_eq!(headers.ref_block_num, 999);
        assert_eq!(headers.ref_block_prefix, 452_435_776);
        assert_eq!(headers.expiration.secs(), 1_527_811_200 + 60);
    }

    #[tokio::test]
    async fn test_get_abi_without_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/get_abi"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"account_name": "emptyaccount"})),
            )
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let result = client.get_abi("emptyaccount").await.unwrap();
        assert!(result.abi.is_none());

        let err = AbiProvider::fetch_abi(&client, "emptyaccount")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_chain_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/push_transaction"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "code": 500,
                "message": "Internal Service Error",
                "error": {
                    "code": 3050003u64,
                    "name": "eosio_assert_message_exception",
                    "what": "eosio_assert_message assertion failure",
                    "details": [
                        {"message": "assertion failure with message: overdrawn balance"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let err = client.push_transaction(&signed_transaction()).await.unwrap_err();
        match err {
            EnuError::Api {
                status_code,
                message,
                error_code,
            } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "assertion failure with message: overdrawn balance");
                assert_eq!(error_code, Some(3_050_003));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_push_is_never_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/push_transaction"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "code": 503,
                "message": "busy"
            })))
            .expect(1)
            .mount(&server)
            .await;

        // retries on, yet the push must go out exactly once
        let config = EnuConfig::custom(&server.uri()).unwrap().with_retry(
            RetryConfig::builder()
                .max_retries(3)
                .initial_delay_ms(1)
                .jitter(false)
                .build(),
        );
        let client = NodeClient::new(&config).unwrap();
        let err = client.push_transaction(&signed_transaction()).await.unwrap_err();
        assert!(matches!(err, EnuError::Api { status_code: 503, .. }));
    }

    #[tokio::test]
    async fn test_reads_retry_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/get_info"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "code": 503,
                "message": "busy"
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/get_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(info_body()))
            .expect(1)
            .mount(&server)
            .await;

        let config = EnuConfig::custom(&server.uri()).unwrap().with_retry(
            RetryConfig::builder()
                .max_retries(3)
                .initial_delay_ms(1)
                .jitter(false)
                .build(),
        );
        let client = NodeClient::new(&config).unwrap();
        let info = client.get_info().await.unwrap();
        assert_eq!(info.head_block_num, 1000);
    }
}
