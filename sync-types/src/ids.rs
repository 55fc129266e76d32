//! Identity and ordering types for queued actions.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::TimestampError;

/// Stable client-generated identifier of a queued action.
///
/// Used for idempotent re-submission, so it never changes once assigned.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(String);

impl LocalId {
    /// Generate a fresh identifier (`local_` + UUID v4).
    pub fn new() -> Self {
        Self(format!("local_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for LocalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for LocalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

/// A point in time with millisecond precision (Unix epoch based).
///
/// Serialized as an RFC 3339 string. Deserializes from either an RFC 3339
/// string, a bare `YYYY-MM-DD` date (midnight UTC), or a number of epoch
/// milliseconds, since queued actions have been stored in all three shapes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The Unix epoch. Used as the time of a remote write that is unknown.
    pub const EPOCH: Self = Self(0);

    /// Create a timestamp from epoch milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Epoch milliseconds.
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Parse an RFC 3339 string, a `YYYY-MM-DD` date, or integer epoch millis.
    pub fn parse(input: &str) -> Result<Self, TimestampError> {
        let trimmed = input.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(parsed.timestamp_millis()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self(midnight.and_utc().timestamp_millis()));
            }
        }
        trimmed
            .parse::<i64>()
            .map(Self)
            .map_err(|_| TimestampError(input.to_string()))
    }

    /// Render as RFC 3339 with millisecond precision (`2024-01-01T00:00:00.000Z`).
    pub fn to_rfc3339(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(datetime) => datetime.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => self.0.to_string(),
        }
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC 3339 string or epoch milliseconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Timestamp::parse(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Timestamp(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(Timestamp)
            .map_err(|_| E::custom(format!("timestamp out of range: {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.is_finite() {
            // Sub-millisecond precision is dropped.
            Ok(Timestamp(v.trunc() as i64))
        } else {
            Err(E::custom("timestamp must be finite"))
        }
    }
}
