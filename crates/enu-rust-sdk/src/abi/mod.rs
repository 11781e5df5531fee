//! Contract ABI handling: document model, per-account cache, and the
//! ABI-driven action data codec.

mod cache;
mod encoder;
mod types;

pub use cache::{AbiCache, RawAbi};
pub use encoder::{decode_action_data, encode_action_data};
pub use types::{Abi, AbiAction, AbiField, AbiStruct, AbiTypeAlias};
