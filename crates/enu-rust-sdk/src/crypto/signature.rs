//! Recoverable secp256k1 signatures in `SIG_K1_` string form.

use super::keys::{PrivateKey, PublicKey};
use super::{ripemd160, sha256};
use crate::error::{EnuError, EnuResult};
use libsecp256k1::curve::Scalar;
use libsecp256k1::{Message, RecoveryId, ECMULT_GEN_CONTEXT};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SIG_PREFIX: &str = "SIG_K1_";
const CHECKSUM_SUFFIX: &[u8] = b"K1";

/// A recoverable signature over a 32-byte digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    inner: libsecp256k1::Signature,
    recovery: RecoveryId,
}

impl Signature {
    /// Signs a 32-byte digest with the given key.
    ///
    /// Nodes only accept canonical signatures: in the compact r/s form
    /// neither component may have the high bit of its leading byte set, and
    /// a zero leading byte must be followed by one with the high bit set.
    /// Plain RFC 6979 lands outside that set about half the time, so the
    /// nonce is re-derived with a counter until the result qualifies.
    pub fn sign_digest(digest: &[u8; 32], key: &PrivateKey) -> Self {
        let message = Message::parse(digest);
        let (inner, recovery) = libsecp256k1::sign(&message, key.secret());
        let mut signature = Self { inner, recovery };
        let mut attempt = 0u32;
        while !signature.is_canonical() {
            attempt += 1;
            if let Some(retry) = Self::sign_with_counter(&message, key, digest, attempt) {
                signature = retry;
            }
        }
        signature
    }

    /// Whether the compact form satisfies the chain's canonical predicate.
    pub fn is_canonical(&self) -> bool {
        let data = self.inner.serialize();
        let r_ok = data[0] & 0x80 == 0 && !(data[0] == 0 && data[1] & 0x80 == 0);
        let s_ok = data[32] & 0x80 == 0 && !(data[32] == 0 && data[33] & 0x80 == 0);
        r_ok && s_ok
    }

    fn sign_with_counter(
        message: &Message,
        key: &PrivateKey,
        digest: &[u8; 32],
        attempt: u32,
    ) -> Option<Self> {
        let mut seed = Vec::with_capacity(68);
        seed.extend_from_slice(&key.secret().serialize());
        seed.extend_from_slice(digest);
        seed.extend_from_slice(&attempt.to_le_bytes());

        let mut nonce = Scalar::default();
        loop {
            let overflow: bool = nonce.set_b32(&sha256(&seed)).into();
            if !overflow && !nonce.is_zero() {
                break;
            }
            seed.push(0);
        }

        let mut seckey = Scalar::default();
        let _ = seckey.set_b32(&key.secret().serialize());
        // sign_raw normalizes s and folds the flip into the recovery id
        let (r, s, recid) = ECMULT_GEN_CONTEXT
            .sign_raw(&seckey, &message.0, &nonce)
            .ok()?;
        let recovery = RecoveryId::parse(recid).ok()?;
        Some(Self {
            inner: libsecp256k1::Signature { r, s },
            recovery,
        })
    }

    /// Verifies the signature over `digest` against `key`.
    pub fn verify_digest(&self, digest: &[u8; 32], key: &PublicKey) -> bool {
        let message = Message::parse(digest);
        libsecp256k1::verify(&message, &self.inner, key.raw())
    }

    /// Recovers the signing public key from `digest`.
    pub fn recover_digest(&self, digest: &[u8; 32]) -> EnuResult<PublicKey> {
        let message = Message::parse(digest);
        libsecp256k1::recover(&message, &self.inner, &self.recovery)
            .map(PublicKey::from_raw)
            .map_err(|_| EnuError::InvalidSignature("recovery failed".to_string()))
    }

    fn to_compact(&self) -> [u8; 65] {
        let mut data = [0u8; 65];
        // 27 marks a compact recoverable signature, 4 a compressed point
        data[0] = 27 + 4 + self.recovery.serialize();
        data[1..].copy_from_slice(&self.inner.serialize());
        data
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compact = self.to_compact();
        let mut checked = compact.to_vec();
        checked.extend_from_slice(CHECKSUM_SUFFIX);
        let checksum = ripemd160(&checked);
        let mut data = compact.to_vec();
        data.extend_from_slice(&checksum[..4]);
        write!(f, "{SIG_PREFIX}{}", bs58::encode(data).into_string())
    }
}

impl FromStr for Signature {
    type Err = EnuError;

    fn from_str(s: &str) -> EnuResult<Self> {
        let body = s.strip_prefix(SIG_PREFIX).ok_or_else(|| {
            EnuError::InvalidSignature(format!("`{s}` lacks the {SIG_PREFIX} prefix"))
        })?;
        let data = bs58::decode(body)
            .into_vec()
            .map_err(|e| EnuError::InvalidSignature(format!("bad base58: {e}")))?;
        if data.len() != 69 {
            return Err(EnuError::InvalidSignature(format!(
                "payload is {} bytes, expected 69",
                data.len()
            )));
        }
        let (compact, checksum) = data.split_at(65);
        let mut checked = compact.to_vec();
        checked.extend_from_slice(CHECKSUM_SUFFIX);
        if ripemd160(&checked)[..4] != *checksum {
            return Err(EnuError::InvalidSignature("checksum mismatch".to_string()));
        }
        let head = compact[0]
            .checked_sub(27 + 4)
            .ok_or_else(|| EnuError::InvalidSignature("bad recovery byte".to_string()))?;
        let recovery = RecoveryId::parse(head)
            .map_err(|_| EnuError::InvalidSignature("bad recovery id".to_string()))?;
        let mut rs = [0u8; 64];
        rs.copy_from_slice(&compact[1..]);
        let inner = libsecp256k1::Signature::parse_standard(&rs)
            .map_err(|_| EnuError::InvalidSignature("r/s outside the curve order".to_string()))?;
        Ok(Self { inner, recovery })
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;

    #[test]
    fn test_sign_verify_recover() {
        let key = PrivateKey::seed_private("key1").unwrap();
        let digest = sha256(b"payload");
        let sig = Signature::sign_digest(&digest, &key);

        assert!(sig.verify_digest(&digest, &key.public_key()));
        assert_eq!(sig.recover_digest(&digest).unwrap(), key.public_key());

        let other = PrivateKey::seed_private("key2").unwrap();
        assert!(!sig.verify_digest(&digest, &other.public_key()));
    }

    #[test]
    fn test_signatures_are_canonical() {
        let key = PrivateKey::seed_private("key1").unwrap();
        for i in 0u32..64 {
            let digest = sha256(format!("payload {i}").as_bytes());
            let sig = Signature::sign_digest(&digest, &key);
            assert!(sig.is_canonical(), "digest {i} signed non-canonically");

            let compact = sig.to_compact();
            assert_eq!(compact[1] & 0x80, 0, "high bit of r set for digest {i}");
            assert!(
                !(compact[1] == 0 && compact[2] & 0x80 == 0),
                "padded r for digest {i}"
            );
            assert_eq!(compact[33] & 0x80, 0, "high bit of s set for digest {i}");
            assert!(
                !(compact[33] == 0 && compact[34] & 0x80 == 0),
                "padded s for digest {i}"
            );

            // nonce-retried signatures must still recover the signer
            assert_eq!(sig.recover_digest(&digest).unwrap(), key.public_key());
        }
    }

    #[test]
    fn test_canonical_signature_round_trips() {
        // a digest known to need at least one nonce retry under RFC 6979
        let key = PrivateKey::seed_private("key1").unwrap();
        let mut retried = None;
        for i in 0u32..64 {
            let digest = sha256(format!("payload {i}").as_bytes());
            let message = Message::parse(&digest);
            let (first, recovery) = libsecp256k1::sign(&message, key.secret());
            let plain = Signature {
                inner: first,
                recovery,
            };
            if !plain.is_canonical() {
                retried = Some(digest);
                break;
            }
        }
        let digest = retried.expect("no digest required a retry");
        let sig = Signature::sign_digest(&digest, &key);
        assert!(sig.is_canonical());
        let back: Signature = sig.to_string().parse().unwrap();
        assert_eq!(back.recover_digest(&digest).unwrap(), key.public_key());
    }

    #[test]
    fn test_string_round_trip() {
        let key = PrivateKey::seed_private("key1").unwrap();
        let digest = sha256(b"payload");
        let sig = Signature::sign_digest(&digest, &key);

        let s = sig.to_string();
        assert!(s.starts_with("SIG_K1_"));
        let back: Signature = s.parse().unwrap();
        assert_eq!(back, sig);
        assert!(back.verify_digest(&digest, &key.public_key()));
    }

    #[test]
    fn test_checksum_is_verified() {
        let key = PrivateKey::seed_private("key1").unwrap();
        let digest = sha256(b"payload");
        let mut s = Signature::sign_digest(&digest, &key).to_string();
        let last = s.pop().unwrap();
        s.push(if last == '1' { '2' } else { '1' });
        assert!(s.parse::<Signature>().is_err());
    }

    #[test]
    fn test_wrong_prefix_is_rejected() {
        assert!("SIG_R1_abcdef".parse::<Signature>().is_err());
    }
}
