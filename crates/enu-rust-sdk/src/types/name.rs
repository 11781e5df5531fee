//! Base32-packed account, action, and permission names.
//!
//! A name is at most 12 characters from `a-z`, `1-5`, and `.`, with an
//! optional 13th character from a reduced range, packed into a u64.

use crate::error::{EnuError, EnuResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

/// A packed on-chain name (account, action, permission, table, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

impl Name {
    /// Parses a name from its string form.
    pub fn new(s: &str) -> EnuResult<Self> {
        s.parse()
    }

    /// Wraps an already-packed name value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the packed u64 form.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Returns true for the empty name.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some(u64::from(c - b'a') + 6),
        b'1'..=b'5' => Some(u64::from(c - b'1') + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl FromStr for Name {
    type Err = EnuError;

    fn from_str(s: &str) -> EnuResult<Self> {
        if s.is_empty() {
            return Err(EnuError::InvalidName("name is empty".to_string()));
        }
        if s.len() > 13 {
            return Err(EnuError::InvalidName(format!(
                "`{s}` is longer than 13 characters"
            )));
        }
        let mut value: u64 = 0;
        for (i, c) in s.bytes().enumerate() {
            let sym = char_to_symbol(c).ok_or_else(|| {
                EnuError::InvalidName(format!(
                    "`{s}` contains invalid character `{}`",
                    c as char
                ))
            })?;
            if i < 12 {
                value |= (sym & 0x1f) << (64 - 5 * (i + 1));
            } else {
                // the 13th character only has 4 bits of room
                if sym > 0x0f {
                    return Err(EnuError::InvalidName(format!(
                        "thirteenth character of `{s}` is out of range"
                    )));
                }
                value |= sym;
            }
        }
        Ok(Self(value))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = [b'.'; 13];
        let mut tmp = self.0;
        for i in 0..13 {
            let idx = if i == 0 { tmp & 0x0f } else { tmp & 0x1f };
            chars[12 - i] = CHARMAP[idx as usize];
            tmp >>= if i == 0 { 4 } else { 5 };
        }
        let end = chars
            .iter()
            .rposition(|&c| c != b'.')
            .map_or(0, |p| p + 1);
        // the packed bytes come straight from CHARMAP, always ASCII
        f.write_str(std::str::from_utf8(&chars[..end]).map_err(|_| fmt::Error)?)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
