//! Response types for the `v1/chain` API.

use crate::crypto::PublicKey;
use crate::error::{EnuError, EnuResult};
use crate::types::TimePointSec;
use serde::Deserialize;
use serde_json::Value;

/// Response from `v1/chain/get_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainInfo {
    /// Version hash of the responding node.
    #[serde(default)]
    pub server_version: String,
    /// The chain id as a hex string.
    pub chain_id: String,
    /// Current head block number.
    pub head_block_num: u32,
    /// Last irreversible block number, the reference block for new
    /// transactions.
    pub last_irreversible_block_num: u32,
    /// Current head block id.
    pub head_block_id: String,
    /// Current head block time.
    pub head_block_time: TimePointSec,
    /// Producer of the current head block.
    #[serde(default)]
    pub head_block_producer: String,
}

impl ChainInfo {
    /// Decodes the chain id into its 32-byte form.
    pub fn chain_id_bytes(&self) -> EnuResult<[u8; 32]> {
        let bytes = hex::decode(&self.chain_id)?;
        bytes
            .try_into()
            .map_err(|_| EnuError::Config("chain id is not 32 bytes".to_string()))
    }
}

/// Response from `v1/chain/get_block`, reduced to the fields transaction
/// headers need.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    /// The block number.
    pub block_num: u32,
    /// The block id.
    pub id: String,
    /// The block timestamp.
    pub timestamp: TimePointSec,
    /// The TAPoS prefix for transactions referencing this block.
    pub ref_block_prefix: u32,
}

/// Response from `v1/chain/get_abi`.
#[derive(Debug, Clone, Deserialize)]
pub struct GetAbiResult {
    /// The account the ABI belongs to.
    pub account_name: String,
    /// The ABI document, absent when the account has none set.
    #[serde(default)]
    pub abi: Option<Value>,
}

/// Response from `v1/chain/get_required_keys`.
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredKeysResponse {
    /// The subset of the offered keys that must sign.
    pub required_keys: Vec<PublicKey>,
}

/// Response from `v1/chain/push_transaction`.
#[derive(Debug, Clone, Deserialize)]
pub struct PushedTransaction {
    /// The id the chain assigned, the digest of the packed transaction.
    pub transaction_id: String,
    /// Execution receipt, when the node returns one.
    #[serde(default)]
    pub processed: Option<Value>,
}

/// An error body as returned by the node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeErrorResponse {
    /// HTTP-level code echoed in the body.
    #[serde(default)]
    pub code: Option<u64>,
    /// Top-level message.
    #[serde(default)]
    pub message: String,
    /// The structured chain error, when present.
    #[serde(default)]
    pub error: Option<NodeErrorDetail>,
}

/// The structured error detail inside a [`NodeErrorResponse`].
#[derive(Debug, Clone, Deserialize)]
pub struct NodeErrorDetail {
    /// The chain error code.
    #[serde(default)]
    pub code: Option<u64>,
    /// The chain error name.
    #[serde(default)]
    pub name: String,
    /// A short description of the error class.
    #[serde(default)]
    pub what: String,
    /// Per-occurrence detail lines.
    #[serde(default)]
    pub details: Vec<NodeErrorLine>,
}

/// One detail line of a chain error.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeErrorLine {
    /// The detail message.
    #[serde(default)]
    pub message: String,
}

impl NodeErrorResponse {
    /// The most specific message available in the body.
    pub fn best_message(&self) -> String {
        if let Some(error) = &self.error {
            if let Some(line) = error.details.first() {
                if !line.message.is_empty() {
                    return line.message.clone();
                }
            }
            if !error.what.is_empty() {
                return error.what.clone();
            }
        }
        if self.message.is_empty() {
            "unknown error".to_string()
        } else {
            self.message.clone()
        }
    }

    /// The chain error code, when the body carries one.
    pub fn chain_error_code(&self) -> Option<u64> {
        self.error.as_ref().and_then(|e| e.code)
    }
}
