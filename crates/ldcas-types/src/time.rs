use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// UTC wall-clock instant, serialized as RFC 3339 with millisecond precision.
///
/// History entries carry a `Timestamp` for display and auditing only; the
/// order of entries in a history file is the authoritative save order, since
/// wall clocks can step backwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time, truncated to the serialized precision.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }

    /// Build from milliseconds since the UNIX epoch.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(Self)
    }

    /// Milliseconds since the UNIX epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Parse an RFC 3339 string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s:?}: {e}")))
    }

    /// RFC 3339 form, e.g. `2024-05-01T12:00:00.000Z`.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_rfc3339()
    }
}
