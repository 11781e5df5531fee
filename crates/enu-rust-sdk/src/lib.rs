//! # Enu Rust SDK
//!
//! An idiomatic Rust SDK for the Enumivo blockchain: transaction assembly,
//! ABI-driven action encoding, key negotiation, signing, and broadcasting.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use enu_rust_sdk::{Enu, EnuConfig, TxOptions};
//! use enu_rust_sdk::crypto::PrivateKey;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let key: PrivateKey = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3".parse()?;
//!     let enu = Enu::new(EnuConfig::mainnet().with_key_provider(Arc::new(key)))?;
//!
//!     let token = enu.contract("enu.token").await?;
//!     let result = token
//!         .push_action(
//!             "transfer",
//!             json!({
//!                 "from": "inita",
//!                 "to": "initb",
//!                 "quantity": "7.0000 ENU",
//!                 "memo": ""
//!             }),
//!             TxOptions::default(),
//!         )
//!         .await?;
//!     println!("pushed {}", result.transaction_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core chain types: names, assets, symbols, timestamps
//! - [`wire`] - Little-endian binary reading and writing
//! - [`crypto`] - Keys, signatures, and digests
//! - [`abi`] - ABI documents, the per-account cache, and action encoding
//! - [`transaction`] - Transaction assembly and the staging builder
//! - [`keys`] - Key negotiation and sign providers
//! - [`api`] - The `v1/chain` node client and provider traits
//!
//! Offline use works throughout: pin headers and a chain id in the
//! configuration, seed ABIs into the cache, and transactions assemble and
//! sign without a node.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod abi;
pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod retry;
pub mod transaction;
pub mod types;
pub mod wire;

mod enu;

// Re-export main entry points
pub use config::{EnuConfig, MockMode, TxOptions};
pub use enu::{Enu, TransactionResult};
pub use error::{EnuError, EnuResult};

// Re-export commonly used types
pub use types::{Asset, Name, Symbol, TimePointSec};
