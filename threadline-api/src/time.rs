use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::Time;

pub const INVALID_DATE: &str = "Invalid Date";

/// A creation time as it comes out of a store
///
/// Document stores disagree on how to represent time: some hand out their own
/// timestamp object, others an epoch in milliseconds, others a string. All of
/// them must go through [`RawTimestamp::normalize`] before being compared.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Native {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    NativeUnderscored {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(rename = "_nanoseconds", default)]
        nanoseconds: u32,
    },
    Millis(i64),
    /// Epoch milliseconds with a fractional part, or out of the `i64` range
    FractionalMillis(serde_json::Number),
    Text(String),
    Unrecognized(serde_json::Value),
}

impl Default for RawTimestamp {
    fn default() -> RawTimestamp {
        RawTimestamp::Unrecognized(serde_json::Value::Null)
    }
}

impl From<Time> for RawTimestamp {
    fn from(t: Time) -> RawTimestamp {
        RawTimestamp::Native {
            seconds: t.timestamp(),
            nanoseconds: t.timestamp_subsec_nanos(),
        }
    }
}

impl RawTimestamp {
    pub fn normalize(&self) -> Timestamp {
        let res = match self {
            RawTimestamp::Native {
                seconds,
                nanoseconds,
            }
            | RawTimestamp::NativeUnderscored {
                seconds,
                nanoseconds,
            } => Utc.timestamp_opt(*seconds, *nanoseconds).single(),
            RawTimestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            RawTimestamp::FractionalMillis(n) => n
                .as_f64()
                .filter(|ms| ms.is_finite() && ms.abs() < i64::MAX as f64)
                .and_then(|ms| Utc.timestamp_millis_opt(ms.round() as i64).single()),
            RawTimestamp::Text(s) => parse_text(s.trim()),
            RawTimestamp::Unrecognized(_) => None,
        };
        match res {
            Some(t) => Timestamp::Valid(t),
            None => {
                tracing::trace!(raw=?self, "unparseable timestamp");
                Timestamp::Invalid
            }
        }
    }
}

fn parse_text(s: &str) -> Option<Time> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&t));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|t| Utc.from_utc_datetime(&t));
    }
    s.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// A normalized creation time
///
/// `Invalid` sorts before any valid time.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Timestamp {
    Invalid,
    Valid(Time),
}

impl Timestamp {
    pub fn is_valid(&self) -> bool {
        matches!(self, Timestamp::Valid(_))
    }

    pub fn time(&self) -> Option<Time> {
        match self {
            Timestamp::Valid(t) => Some(*t),
            Timestamp::Invalid => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Valid(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S UTC")),
            Timestamp::Invalid => f.write_str(INVALID_DATE),
        }
    }
}
