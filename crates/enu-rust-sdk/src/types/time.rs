//! Second-resolution timestamps.
//!
//! Block times and transaction expirations travel as ISO-8601 strings without
//! a zone suffix (`2018-06-01T00:00:00`) and pack as u32 seconds since the
//! Unix epoch.

use crate::error::{EnuError, EnuResult};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Seconds since the Unix epoch, as the chain stores timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePointSec(u32);

impl TimePointSec {
    /// Wraps a raw seconds-since-epoch value.
    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Returns the raw seconds-since-epoch value.
    pub fn secs(&self) -> u32 {
        self.0
    }

    /// Returns this time point shifted forward by `secs` seconds.
    pub fn plus_secs(&self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl FromStr for TimePointSec {
    type Err = EnuError;

    fn from_str(s: &str) -> EnuResult<Self> {
        let invalid =
            || EnuError::serialize(format!("`{s}` is not an ISO-8601 second timestamp"));
        // tolerate trailing `Z` and fractional seconds, which some nodes emit
        let trimmed = s.strip_suffix('Z').unwrap_or(s);
        let trimmed = match trimmed.split_once('.') {
            Some((head, frac)) if !frac.is_empty() && frac.bytes().all(|c| c.is_ascii_digit()) => {
                head
            }
            Some(_) => return Err(invalid()),
            None => trimmed,
        };
        let parsed = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
            .map_err(|_| invalid())?;
        u32::try_from(parsed.and_utc().timestamp())
            .map(Self)
            .map_err(|_| EnuError::serialize(format!("`{s}` is outside the u32 second range")))
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let utc = DateTime::from_timestamp(i64::from(self.0), 0)
            .expect("u32 seconds are within the representable range");
        write!(f, "{}", utc.format(TIMESTAMP_FORMAT))
    }
}

impl Serialize for TimePointSec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimePointSec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        let t: TimePointSec = "1970-01-01T00:00:00".parse().unwrap();
        assert_eq!(t.secs(), 0);
        assert_eq!(t.to_string(), "1970-01-01T00:00:00");
    }

    #[test]
    fn test_known_timestamp() {
        let t: TimePointSec = "2018-06-01T00:00:00".parse().unwrap();
        assert_eq!(t.secs(), 1_527_811_200);
    }

    #[test]
    fn test_fractional_seconds_and_zone_suffix() {
        let base: TimePointSec = "2018-06-01T12:30:45".parse().unwrap();
        let with_ms: TimePointSec = "2018-06-01T12:30:45.500".parse().unwrap();
        let with_z: TimePointSec = "2018-06-01T12:30:45Z".parse().unwrap();
        assert_eq!(with_ms, base);
        assert_eq!(with_z, base);
    }

    #[test]
    fn test_round_trip() {
        for s in [
            "1999-12-31T23:59:59",
            "2000-02-29T00:00:00",
            "2018-06-01T12:00:00",
            "2100-01-01T06:30:00",
        ] {
            let t: TimePointSec = s.parse().unwrap();
            assert_eq!(t.to_string(), s, "round trip of {s}");
        }
    }

    #[test]
    fn test_plus_secs() {
        let t: TimePointSec = "2018-06-01T00:00:00".parse().unwrap();
        assert_eq!(t.plus_secs(60).to_string(), "2018-06-01T00:01:00");
    }

    #[test]
    fn test_invalid_timestamps() {
        assert!("2018-13-01T00:00:00".parse::<TimePointSec>().is_err());
        assert!("2018-02-30T00:00:00".parse::<TimePointSec>().is_err());
        assert!("2018-06-01T24:00:00".parse::<TimePointSec>().is_err());
        assert!("2018-06-01".parse::<TimePointSec>().is_err());
        assert!("1969-12-31T23:59:59".parse::<TimePointSec>().is_err());
    }

    #[test]
    fn test_u32_range_boundary() {
        assert_eq!(
            TimePointSec::from_secs(u32::MAX).to_string(),
            "2106-02-07T06:28:15"
        );
        assert!("2107-01-01T00:00:00".parse::<TimePointSec>().is_err());
    }
}
