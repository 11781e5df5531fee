//! secp256k1 key pairs in their chain string forms.
//!
//! Private keys travel as WIF (base58check with a `0x80` version byte),
//! public keys as `ENU`-prefixed base58 with a RIPEMD-160 checksum.

use super::{ripemd160, sha256, sha256d};
use crate::error::{EnuError, EnuResult};
use libsecp256k1::{PublicKey as RawPublicKey, SecretKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// String prefix carried by public keys.
pub const PUBLIC_KEY_PREFIX: &str = "ENU";

const WIF_VERSION: u8 = 0x80;

/// A secp256k1 private key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(SecretKey);

impl PrivateKey {
    /// Generates a fresh random key from the OS entropy source.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut rng = rand::rngs::OsRng;
        loop {
            let mut buf = [0u8; 32];
            rng.fill_bytes(&mut buf);
            if let Ok(secret) = SecretKey::parse(&buf) {
                return Self(secret);
            }
        }
    }

    /// Derives a deterministic key from a seed phrase.
    ///
    /// Only suitable for tests and development accounts: anyone who knows the
    /// seed knows the key.
    pub fn seed_private(seed: &str) -> EnuResult<Self> {
        let digest = sha256(seed.as_bytes());
        SecretKey::parse(&digest)
            .map(Self)
            .map_err(|_| EnuError::InvalidKey(format!("seed `{seed}` hashes outside the curve order")))
    }

    /// Parses a WIF-encoded private key.
    pub fn from_wif(wif: &str) -> EnuResult<Self> {
        let data = bs58::decode(wif)
            .into_vec()
            .map_err(|e| EnuError::InvalidKey(format!("bad base58 in WIF: {e}")))?;
        if data.len() != 37 {
            return Err(EnuError::InvalidKey(format!(
                "WIF payload is {} bytes, expected 37",
                data.len()
            )));
        }
        let (payload, checksum) = data.split_at(33);
        if sha256d(payload)[..4] != *checksum {
            return Err(EnuError::InvalidKey("WIF checksum mismatch".to_string()));
        }
        if payload[0] != WIF_VERSION {
            return Err(EnuError::InvalidKey(format!(
                "WIF version byte {:#04x}, expected {WIF_VERSION:#04x}",
                payload[0]
            )));
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&payload[1..]);
        SecretKey::parse(&buf)
            .map(Self)
            .map_err(|_| EnuError::InvalidKey("WIF scalar is outside the curve order".to_string()))
    }

    /// Encodes the key in WIF form.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(37);
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.0.serialize());
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    /// Returns the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(RawPublicKey::from_secret_key(&self.0))
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.0
    }
}

impl FromStr for PrivateKey {
    type Err = EnuError;

    fn from_str(s: &str) -> EnuResult<Self> {
        Self::from_wif(s)
    }
}

// Key material never appears in Debug output.
impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A secp256k1 public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(RawPublicKey);

impl PublicKey {
    /// Returns the 33-byte compressed point.
    pub fn to_compressed(&self) -> [u8; 33] {
        self.0.serialize_compressed()
    }

    /// Parses a 33-byte compressed point.
    pub fn from_compressed(bytes: &[u8; 33]) -> EnuResult<Self> {
        RawPublicKey::parse_compressed(bytes)
            .map(Self)
            .map_err(|_| EnuError::InvalidKey("bytes are not a compressed curve point".to_string()))
    }

    pub(crate) fn from_raw(raw: RawPublicKey) -> Self {
        Self(raw)
    }

    pub(crate) fn raw(&self) -> &RawPublicKey {
        &self.0
    }
}

impl FromStr for PublicKey {
    type Err = EnuError;

    fn from_str(s: &str) -> EnuResult<Self> {
        let body = s.strip_prefix(PUBLIC_KEY_PREFIX).ok_or_else(|| {
            EnuError::InvalidKey(format!("public key `{s}` lacks the {PUBLIC_KEY_PREFIX} prefix"))
        })?;
        let data = bs58::decode(body)
            .into_vec()
            .map_err(|e| EnuError::InvalidKey(format!("bad base58 in public key: {e}")))?;
        if data.len() != 37 {
            return Err(EnuError::InvalidKey(format!(
                "public key payload is {} bytes, expected 37",
                data.len()
            )));
        }
        let (payload, checksum) = data.split_at(33);
        if ripemd160(payload)[..4] != *checksum {
            return Err(EnuError::InvalidKey("public key checksum mismatch".to_string()));
        }
        let mut buf = [0u8; 33];
        buf.copy_from_slice(payload);
        Self::from_compressed(&buf)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = self.to_compressed();
        let checksum = ripemd160(&payload);
        let mut data = Vec::with_capacity(37);
        data.extend_from_slice(&payload);
        data.extend_from_slice(&checksum[..4]);
        write!(f, "{PUBLIC_KEY_PREFIX}{}", bs58::encode(data).into_string())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wif_round_trip() {
        let key = PrivateKey::generate();
        let wif = key.to_wif();
        let back = PrivateKey::from_wif(&wif).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_seed_private_is_deterministic() {
        let a = PrivateKey::seed_private("key1").unwrap();
        let b = PrivateKey::seed_private("key1").unwrap();
        let c = PrivateKey::seed_private("key2").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.public_key(), c.public_key());
    }

    #[test]
    fn test_public_key_string_round_trip() {
        let key = PrivateKey::seed_private("key1").unwrap().public_key();
        let s = key.to_string();
        assert!(s.starts_with("ENU"));
        let back: PublicKey = s.parse().unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_public_key_checksum_is_verified() {
        let mut s = PrivateKey::seed_private("key1")
            .unwrap()
            .public_key()
            .to_string();
        // flip the final character to corrupt the checksum
        let last = s.pop().unwrap();
        s.push(if last == '1' { '2' } else { '1' });
        assert!(s.parse::<PublicKey>().is_err());
    }

    #[test]
    fn test_wrong_prefix_is_rejected() {
        let s = PrivateKey::seed_private("key1")
            .unwrap()
            .public_key()
            .to_string();
        let eos_form = format!("EOS{}", &s[3..]);
        assert!(eos_form.parse::<PublicKey>().is_err());
    }

    #[test]
    fn test_corrupted_wif_is_rejected() {
        let mut wif = PrivateKey::generate().to_wif();
        let last = wif.pop().unwrap();
        wif.push(if last == '1' { '2' } else { '1' });
        assert!(PrivateKey::from_wif(&wif).is_err());
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let key = PrivateKey::generate();
        assert_eq!(format!("{key:?}"), "PrivateKey(..)");
    }
}
