//! Utilities. OBVIOUSLY.

use chrono::{DateTime, Duration, Utc};
use serde_derive::{Deserialize, Serialize};
use std::ops::Deref;
use std::str::FromStr;

pub(crate) mod ser;

/// A library-local representation of a time.
///
/// Pending requests get stamped with one of these when they're created so we
/// can tell how long a confirmation link has been floating around out there.
/// Serializes as RFC 3339, and you can always get the underlying
/// [DateTime<Utc>](chrono::DateTime) via a `&timestamp` deref.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from the current date/time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// How long ago (relative to `now`) this timestamp was. Timestamps from the
    /// future come back as zero rather than negative.
    pub fn age(&self, now: &Timestamp) -> Duration {
        let age = now.0.signed_duration_since(self.0);
        if age < Duration::zero() {
            Duration::zero()
        } else {
            age
        }
    }
}

impl Deref for Timestamp {
    type Target = DateTime<Utc>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for Timestamp {
    type Err = chrono::format::ParseError;
    fn from_str(s: &str) -> std::result::Result<Timestamp, Self::Err> {
        let datetime: DateTime<Utc> = s.parse()?;
        Ok(Timestamp(datetime))
    }
}
