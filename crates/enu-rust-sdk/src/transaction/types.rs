//! Transaction wire types.

use crate::crypto::{sha256, Signature};
use crate::error::{EnuError, EnuResult};
use crate::types::{Name, TimePointSec};
use crate::wire::ByteWriter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// An actor/permission pair authorizing an action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionLevel {
    /// The authorizing account.
    pub actor: Name,
    /// The permission being exercised, usually `active`.
    pub permission: Name,
}

impl PermissionLevel {
    /// Creates a permission level from name strings.
    pub fn new(actor: &str, permission: &str) -> EnuResult<Self> {
        Ok(Self {
            actor: actor.parse()?,
            permission: permission.parse()?,
        })
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

/// A partially specified authorization, as accepted from configuration.
///
/// `"inita"` fixes the actor, `"inita@owner"` both halves, and `"@posting"`
/// only the permission; missing halves are filled in during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSpec {
    /// The actor, if pinned.
    pub actor: Option<Name>,
    /// The permission, if pinned.
    pub permission: Option<Name>,
}

impl FromStr for AuthSpec {
    type Err = EnuError;

    fn from_str(s: &str) -> EnuResult<Self> {
        let (actor, permission) = match s.split_once('@') {
            Some((actor, permission)) => (actor, Some(permission)),
            None => (s, None),
        };
        if actor.is_empty() && permission.map_or(true, str::is_empty) {
            return Err(EnuError::transaction(format!(
                "`{s}` is not an authorization"
            )));
        }
        Ok(Self {
            actor: if actor.is_empty() {
                None
            } else {
                Some(actor.parse()?)
            },
            permission: match permission {
                Some("") | None => None,
                Some(p) => Some(p.parse()?),
            },
        })
    }
}

impl From<PermissionLevel> for AuthSpec {
    fn from(level: PermissionLevel) -> Self {
        Self {
            actor: Some(level.actor),
            permission: Some(level.permission),
        }
    }
}

/// Action payload: either already packed (hex) or structured JSON awaiting
/// ABI encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionData {
    /// Hex-encoded packed payload, passed through untouched.
    Hex(String),
    /// Structured payload, encoded against the contract ABI at assembly time.
    Structured(Value),
}

impl ActionData {
    /// Returns the hex payload, if already packed.
    pub fn as_hex(&self) -> Option<&str> {
        match self {
            Self::Hex(h) => Some(h),
            Self::Structured(_) => None,
        }
    }

    /// Returns the structured payload, if not yet packed.
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Hex(_) => None,
            Self::Structured(v) => Some(v),
        }
    }
}

/// A single contract action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The contract account.
    pub account: Name,
    /// The action name.
    pub name: Name,
    /// Authorizing permission levels, in submission order.
    #[serde(default)]
    pub authorization: Vec<PermissionLevel>,
    /// The payload.
    pub data: ActionData,
}

impl Action {
    /// Creates an action with a structured payload and no authorization.
    pub fn structured(account: &str, name: &str, data: Value) -> EnuResult<Self> {
        Ok(Self {
            account: account.parse()?,
            name: name.parse()?,
            authorization: Vec::new(),
            data: ActionData::Structured(data),
        })
    }

    /// Creates an action with an already-packed hex payload.
    pub fn hex(account: &str, name: &str, data: impl Into<String>) -> EnuResult<Self> {
        Ok(Self {
            account: account.parse()?,
            name: name.parse()?,
            authorization: Vec::new(),
            data: ActionData::Hex(data.into()),
        })
    }

    /// Returns the action with the given authorization attached.
    pub fn with_authorization(mut self, authorization: Vec<PermissionLevel>) -> Self {
        self.authorization = authorization;
        self
    }
}

/// TaPoS and resource-limit header fields shared by every transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionHeader {
    /// When the transaction stops being accepted.
    pub expiration: TimePointSec,
    /// Low 16 bits of the reference block number.
    pub ref_block_num: u16,
    /// Prefix of the reference block id, proving recent chain knowledge.
    pub ref_block_prefix: u32,
    /// Upper bound on net usage, in 8-byte words; 0 means no cap.
    #[serde(default)]
    pub max_net_usage_words: u32,
    /// Upper bound on cpu usage in milliseconds; 0 means no cap.
    #[serde(default)]
    pub max_cpu_usage_ms: u8,
    /// Seconds the transaction is delayed before execution.
    #[serde(default)]
    pub delay_sec: u32,
}

/// A full transaction ready for packing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Header fields.
    #[serde(flatten)]
    pub header: TransactionHeader,
    /// Actions executed without authorization checks.
    #[serde(default)]
    pub context_free_actions: Vec<Action>,
    /// Actions, in the order they were staged.
    pub actions: Vec<Action>,
    /// Protocol extensions; empty today.
    #[serde(default)]
    pub transaction_extensions: Vec<(u16, String)>,
}

impl Transaction {
    /// Packs the transaction into its wire form.
    ///
    /// Every action payload must already be hex at this point.
    pub fn pack(&self) -> EnuResult<Vec<u8>> {
        let mut writer = ByteWriter::new();
        writer.write_time_point_sec(self.header.expiration);
        writer.write_u16(self.header.ref_block_num);
        writer.write_u32(self.header.ref_block_prefix);
        writer.write_varuint32(self.header.max_net_usage_words);
        writer.write_u8(self.header.max_cpu_usage_ms);
        writer.write_varuint32(self.header.delay_sec);
        pack_actions(&mut writer, &self.context_free_actions)?;
        pack_actions(&mut writer, &self.actions)?;
        writer.write_varuint32(self.transaction_extensions.len() as u32);
        for (kind, data) in &self.transaction_extensions {
            writer.write_u16(*kind);
            writer.write_bytes(&hex::decode(data)?);
        }
        Ok(writer.into_bytes())
    }

    /// The byte string that gets signed: chain id, packed transaction, and
    /// the (empty) context-free data digest.
    pub fn signing_message(&self, chain_id: &[u8; 32]) -> EnuResult<Vec<u8>> {
        let packed = self.pack()?;
        let mut buf = Vec::with_capacity(64 + packed.len());
        buf.extend_from_slice(chain_id);
        buf.extend_from_slice(&packed);
        buf.extend_from_slice(&[0u8; 32]);
        Ok(buf)
    }

    /// The 32-byte digest signatures are made over.
    pub fn signing_digest(&self, chain_id: &[u8; 32]) -> EnuResult<[u8; 32]> {
        Ok(sha256(&self.signing_message(chain_id)?))
    }

    /// The transaction id: the digest of the packed form, as hex.
    pub fn id(&self) -> EnuResult<String> {
        Ok(hex::encode(sha256(&self.pack()?)))
    }
}

fn pack_actions(writer: &mut ByteWriter, actions: &[Action]) -> EnuResult<()> {
    writer.write_varuint32(actions.len() as u32);
    for action in actions {
        writer.write_name(&action.account);
        writer.write_name(&action.name);
        writer.write_varuint32(action.authorization.len() as u32);
        for level in &action.authorization {
            writer.write_name(&level.actor);
            writer.write_name(&level.permission);
        }
        let hex_data = action.data.as_hex().ok_or_else(|| {
            EnuError::transaction(format!(
                "action {}::{} still has unencoded data",
                action.account, action.name
            ))
        })?;
        writer.write_bytes(&hex::decode(hex_data)?);
    }
    Ok(())
}

/// A transaction plus its signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The assembled transaction.
    pub transaction: Transaction,
    /// Signatures in key-resolution order.
    pub signatures: Vec<Signature>,
}

/// A caller-supplied transaction outline: actions plus optional header
/// overrides, the object form of submitting a transaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionIntent {
    /// Actions to execute, in order.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Context-free actions.
    #[serde(default)]
    pub context_free_actions: Vec<Action>,
    /// Overrides the configured delay.
    #[serde(default)]
    pub delay_sec: Option<u32>,
    /// Overrides the configured net cap.
    #[serde(default)]
    pub max_net_usage_words: Option<u32>,
    /// Overrides the configured cpu cap.
    #[serde(default)]
    pub max_cpu_usage_ms: Option<u8>,
    /// Overrides the configured expiration offset.
    #[serde(default)]
    pub expire_in_seconds: Option<u32>,
}

impl TransactionIntent {
    /// Builds an intent from a JSON object.
    pub fn from_value(value: Value) -> EnuResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
