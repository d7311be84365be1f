//! Destination object naming.

use std::fmt;

use chrono::{DateTime, Utc};

/// Name of the object a successful run writes:
/// `{source}_{yyyyMMddHHmmss}.csv`.
///
/// Distinct instants at one-second resolution never collide. Two runs in the
/// same second for the same source produce the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationName(String);

impl DestinationName {
    pub const EXTENSION: &'static str = "csv";

    pub fn new(source: &str, at: DateTime<Utc>) -> Self {
        DestinationName(format!(
            "{}_{}.{}",
            source,
            at.format("%Y%m%d%H%M%S"),
            Self::EXTENSION
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DestinationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DestinationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
