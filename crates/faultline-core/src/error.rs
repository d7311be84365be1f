//! Typed errors for a single extraction run.

use thiserror::Error;

/// Errors that end an extraction run.
///
/// None of these are recovered inside the core: the first one encountered
/// stops the run and is reported in [`crate::JobOutcome::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The data source could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The parameterized call was rejected or failed before producing rows.
    #[error("query failed: {0}")]
    Query(String),

    /// Consuming the row sequence failed after it was opened.
    #[error("read failed: {0}")]
    Read(String),

    /// The output object could not be written.
    #[error("storage write failed: {0}")]
    Storage(String),

    /// The run was aborted by its host (timeout or shutdown).
    #[error("cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Connection(_) => "connection",
            ExtractError::Query(_) => "query",
            ExtractError::Read(_) => "read",
            ExtractError::Storage(_) => "storage",
            ExtractError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause() {
        let err = ExtractError::Storage("quota exceeded".to_string());
        assert_eq!(err.to_string(), "storage write failed: quota exceeded");
        assert_eq!(ExtractError::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn kind_labels_are_distinct() {
        let kinds = [
            ExtractError::Connection(String::new()).kind(),
            ExtractError::Query(String::new()).kind(),
            ExtractError::Read(String::new()).kind(),
            ExtractError::Storage(String::new()).kind(),
            ExtractError::Cancelled.kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
