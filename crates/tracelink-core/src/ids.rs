use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier correlating the events produced by one issued link.
///
/// Issued ids are the issuance instant in Unix milliseconds. Ids arriving on
/// the capture surface are accepted verbatim, so any string is a valid id.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Placeholder used when a capture request carries no session.
    pub const UNKNOWN: &'static str = "unknown";

    pub fn from_clock(now: DateTime<Utc>) -> Self {
        Self(now.timestamp_millis().to_string())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_owned())
    }

    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
