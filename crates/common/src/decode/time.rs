//! Marshalled timestamps.
//!
//! Layout (big endian):
//!
//! | bytes  | field                                          |
//! |--------|------------------------------------------------|
//! | 0      | version, 1 or 2                                |
//! | 1..9   | seconds since 0001-01-01T00:00:00Z (i64)       |
//! | 9..13  | nanoseconds (i32)                              |
//! | 13..15 | zone offset in minutes (i16), `-1` means UTC   |
//! | 15     | version 2 only: extra offset seconds           |

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

use super::DecodeError;

const VERSION_1: u8 = 1;
const VERSION_2: u8 = 2;
const VERSION_1_LEN: usize = 15;
const VERSION_2_LEN: usize = 16;

/// Seconds between 0001-01-01 and the unix epoch.
const UNIX_TO_INTERNAL: i64 = 62_135_596_800;
const UTC_MARKER: i16 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedTime {
    /// `YYYY-MM-DD HH:MM:SS ZONE` in the encoded zone
    pub formatted: String,
    pub unix_seconds: i64,
    /// RFC 3339, second precision
    pub iso8601: String,
}

impl DecodedTime {
    fn from_instant(instant: DateTime<FixedOffset>, is_utc: bool) -> Self {
        let zone = if is_utc {
            "UTC".to_string()
        } else {
            instant.format("%z").to_string()
        };
        DecodedTime {
            formatted: format!("{} {}", instant.format("%Y-%m-%d %H:%M:%S"), zone),
            unix_seconds: instant.timestamp(),
            iso8601: instant.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

pub fn decode_time(raw: &[u8]) -> Result<DecodedTime, DecodeError> {
    let invalid = |reason: String| DecodeError::Time(reason);

    let version = *raw.first().ok_or_else(|| invalid("no data".into()))?;
    let expected = match version {
        VERSION_1 => VERSION_1_LEN,
        VERSION_2 => VERSION_2_LEN,
        other => return Err(invalid(format!("unsupported version {}", other))),
    };
    if raw.len() != expected {
        return Err(invalid(format!(
            "version {} needs {} bytes, got {}",
            version,
            expected,
            raw.len()
        )));
    }

    let seconds = BigEndian::read_i64(&raw[1..9]);
    let nanos = BigEndian::read_i32(&raw[9..13]);
    let offset_minutes = BigEndian::read_i16(&raw[13..15]);

    let nanos = u32::try_from(nanos)
        .ok()
        .filter(|n| *n < 1_000_000_000)
        .ok_or_else(|| invalid(format!("nanoseconds out of range: {}", nanos)))?;

    let is_utc = offset_minutes == UTC_MARKER;
    let mut offset_seconds = if is_utc {
        0
    } else {
        i32::from(offset_minutes) * 60
    };
    if version == VERSION_2 {
        offset_seconds += i32::from(raw[15] as i8);
    }

    let offset = FixedOffset::east_opt(offset_seconds)
        .ok_or_else(|| invalid(format!("zone offset out of range: {}s", offset_seconds)))?;
    let unix = seconds
        .checked_sub(UNIX_TO_INTERNAL)
        .ok_or_else(|| invalid(format!("seconds out of range: {}", seconds)))?;
    let instant = DateTime::from_timestamp(unix, nanos)
        .ok_or_else(|| invalid(format!("seconds out of range: {}", seconds)))?
        .with_timezone(&offset);

    Ok(DecodedTime::from_instant(instant, is_utc))
}
