//! Asset amounts and their symbols.
//!
//! An asset string like `"1.0000 ENU"` carries its precision in the number of
//! fraction digits. Parsing never rescales: `"1 ENU"` and `"1.0000 ENU"` are
//! different symbols as far as the chain is concerned.

use crate::error::{EnuError, EnuResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MAX_PRECISION: u8 = 18;

/// A token symbol: a precision and a 1-7 character uppercase code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    precision: u8,
    code: String,
}

impl Symbol {
    /// Creates a symbol, validating precision and code.
    pub fn new(precision: u8, code: &str) -> EnuResult<Self> {
        if precision > MAX_PRECISION {
            return Err(EnuError::InvalidAsset(format!(
                "precision {precision} exceeds {MAX_PRECISION}"
            )));
        }
        if code.is_empty() || code.len() > 7 || !code.bytes().all(|c| c.is_ascii_uppercase()) {
            return Err(EnuError::InvalidAsset(format!(
                "symbol code `{code}` must be 1-7 uppercase letters"
            )));
        }
        Ok(Self {
            precision,
            code: code.to_string(),
        })
    }

    /// Returns the number of fraction digits.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Returns the symbol code, e.g. `"ENU"`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Packs the symbol into its wire u64 form.
    pub fn raw(&self) -> u64 {
        let mut v = u64::from(self.precision);
        for (i, c) in self.code.bytes().enumerate() {
            v |= u64::from(c) << (8 * (i + 1));
        }
        v
    }

    /// Unpacks a symbol from its wire u64 form.
    pub fn from_raw(raw: u64) -> EnuResult<Self> {
        let precision = (raw & 0xff) as u8;
        let mut code = String::new();
        let mut rest = raw >> 8;
        while rest > 0 {
            let c = (rest & 0xff) as u8;
            if !c.is_ascii_uppercase() {
                return Err(EnuError::InvalidAsset(format!(
                    "packed symbol {raw:#x} contains invalid code byte"
                )));
            }
            code.push(c as char);
            rest >>= 8;
        }
        Self::new(precision, &code)
    }

    /// Scale factor for the amount: `10^precision`.
    pub fn scale(&self) -> i64 {
        10i64.pow(u32::from(self.precision))
    }
}

/// Symbols print as `precision,CODE`, e.g. `4,ENU`.
impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl FromStr for Symbol {
    type Err = EnuError;

    fn from_str(s: &str) -> EnuResult<Self> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| EnuError::InvalidAsset(format!("symbol `{s}` is not `precision,CODE`")))?;
        let precision: u8 = precision
            .parse()
            .map_err(|_| EnuError::InvalidAsset(format!("bad precision in symbol `{s}`")))?;
        Self::new(precision, code)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A token amount paired with its symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    amount: i64,
    symbol: Symbol,
}

impl Asset {
    /// Creates an asset from a raw amount and symbol.
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    /// Returns the raw amount in the symbol's smallest unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Parses an asset string, requiring it to match `expected` exactly.
    ///
    /// A code mismatch is an [`EnuError::InvalidAsset`]; a precision mismatch
    /// (`"10000.00 SYM"` against `0,SYM`) is [`EnuError::PrecisionMismatch`].
    pub fn from_str_with_symbol(s: &str, expected: &Symbol) -> EnuResult<Self> {
        let asset: Asset = s.parse()?;
        if asset.symbol.code() != expected.code() {
            return Err(EnuError::InvalidAsset(format!(
                "`{s}` does not carry symbol code {}",
                expected.code()
            )));
        }
        if asset.symbol.precision() != expected.precision() {
            return Err(EnuError::PrecisionMismatch {
                value: s.to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(asset)
    }
}

impl FromStr for Asset {
    type Err = EnuError;

    fn from_str(s: &str) -> EnuResult<Self> {
        let invalid = || EnuError::InvalidAsset(format!("`{s}` is not a valid asset"));
        let mut parts = s.split_whitespace();
        let amount_str = parts.next().ok_or_else(invalid)?;
        let code = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let (negative, digits) = match amount_str.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, amount_str),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|c| c.is_ascii_digit())
            || !frac_part.bytes().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac_part.len() > usize::from(MAX_PRECISION) {
            return Err(EnuError::InvalidAsset(format!(
                "`{s}` has more than {MAX_PRECISION} fraction digits"
            )));
        }

        let symbol = Symbol::new(frac_part.len() as u8, code)?;
        let int: i64 = int_part.parse().map_err(|_| invalid())?;
        let frac: i64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid())?
        };
        let magnitude = int
            .checked_mul(symbol.scale())
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(|| EnuError::InvalidAsset(format!("`{s}` overflows the amount range")))?;
        let amount = if negative { -magnitude } else { magnitude };
        Ok(Self { amount, symbol })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = i128::from(self.symbol.scale());
        let amount = i128::from(self.amount);
        let sign = if amount < 0 { "-" } else { "" };
        let magnitude = amount.abs();
        if self.symbol.precision() == 0 {
            write!(f, "{sign}{magnitude} {}", self.symbol.code())
        } else {
            write!(
                f,
                "{sign}{}.{:0width$} {}",
                magnitude / scale,
                magnitude % scale,
                self.symbol.code(),
                width = usize::from(self.symbol.precision())
            )
        }
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
