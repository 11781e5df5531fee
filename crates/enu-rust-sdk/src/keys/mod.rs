//! Key negotiation and signing providers.

pub mod negotiator;
pub mod provider;
pub mod signer;

pub use negotiator::{authorization_requirements, negotiate_keys};
pub use provider::{KeyProvider, KeyProviderFn, KeyQuery, ProvidedKey};
pub use signer::{sign, sign_transaction, SignProvider, SignProviderFn, SignRequest};
