//! Millisecond timestamp codec
//!
//! Profiles are stamped at millisecond resolution and written as RFC 3339
//! strings with exactly three fractional digits. Reads rehydrate either an
//! RFC 3339 string or an integer of epoch milliseconds, so blobs written by
//! older clients that stored raw epoch values still load.
//!
//! Use with `#[serde(with = "timestamp")]` or
//! `#[serde(with = "timestamp::option")]`.

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

/// UTC instant used for every date-bearing field
pub type Timestamp = DateTime<Utc>;

/// Current instant truncated to milliseconds
#[inline]
#[must_use]
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

/// Wire form of a timestamp
#[inline]
#[must_use]
pub fn to_wire(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 string into a UTC timestamp
#[must_use]
pub fn parse(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Timestamp from epoch milliseconds
#[inline]
#[must_use]
pub fn from_millis(ms: i64) -> Option<Timestamp> {
    Utc.timestamp_millis_opt(ms).single()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
}

impl RawTimestamp {
    fn rehydrate<E: de::Error>(self) -> Result<Timestamp, E> {
        match self {
            Self::Text(raw) => {
                parse(&raw).ok_or_else(|| E::custom(format!("invalid timestamp: {raw}")))
            }
            Self::Millis(ms) => {
                from_millis(ms).ok_or_else(|| E::custom(format!("timestamp out of range: {ms}")))
            }
        }
    }
}

/// Serialize a timestamp as RFC 3339 with millisecond precision
///
/// # Errors
/// Propagates serializer errors
pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_wire(ts))
}

/// Deserialize a timestamp from RFC 3339 or epoch milliseconds
///
/// # Errors
/// Fails on unparseable strings or out-of-range millisecond values
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    RawTimestamp::deserialize(deserializer)?.rehydrate()
}

/// Codec for optional timestamps
pub mod option {
    use super::{to_wire, RawTimestamp, Timestamp};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional timestamp
    ///
    /// # Errors
    /// Propagates serializer errors
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        ts: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_some(&to_wire(ts)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional timestamp; `null` maps to `None`
    ///
    /// # Errors
    /// Fails on unparseable strings or out-of-range millisecond values
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        Option::<RawTimestamp>::deserialize(deserializer)?
            .map(RawTimestamp::rehydrate)
            .transpose()
    }
}
