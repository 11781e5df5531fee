//! Chain API: the node client, provider traits, and response types.

pub mod node;
pub mod provider;
pub mod response;

pub use node::NodeClient;
pub use provider::{
    AbiProvider, Broadcaster, HeaderProvider, RequiredKeysProvider, StaticHeaders,
};
pub use response::{
    BlockInfo, ChainInfo, GetAbiResult, NodeErrorResponse, PushedTransaction,
    RequiredKeysResponse,
};
