//! Typed errors for the connectors crate.
//!
//! [`ConnectorError`] covers setup (bad URLs, missing credentials). Errors
//! raised while a run is in flight are mapped onto
//! [`faultline_core::ExtractError`] by the helpers below.

use std::fmt;

use faultline_core::ExtractError;

/// Errors that can occur while building a connector.
#[derive(Debug)]
pub enum ConnectorError {
    /// Failed to set up a connection to the data source.
    ConnectionFailed(String),
    /// The URI scheme is not supported by any connector.
    UnsupportedUri(String),
    /// Invalid or missing configuration.
    ConfigError(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            ConnectorError::UnsupportedUri(msg) => write!(f, "unsupported URI: {}", msg),
            ConnectorError::ConfigError(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl From<anyhow::Error> for ConnectorError {
    fn from(e: anyhow::Error) -> Self {
        ConnectorError::ConfigError(e.to_string())
    }
}

impl From<sqlx::Error> for ConnectorError {
    fn from(e: sqlx::Error) -> Self {
        ConnectorError::ConnectionFailed(e.to_string())
    }
}

impl From<object_store::Error> for ConnectorError {
    fn from(e: object_store::Error) -> Self {
        ConnectorError::ConfigError(e.to_string())
    }
}

impl From<url::ParseError> for ConnectorError {
    fn from(e: url::ParseError) -> Self {
        ConnectorError::UnsupportedUri(e.to_string())
    }
}

/// SQLSTATE classes that mean the server never let us run the statement:
/// connection exceptions, authorization failures, unknown database and
/// operator intervention.
fn is_connection_sqlstate(code: &str) -> bool {
    code.starts_with("08") || code.starts_with("28") || code == "3D000" || code.starts_with("57P")
}

pub(crate) fn is_connection_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Configuration(_)
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|c| is_connection_sqlstate(&c)),
        _ => false,
    }
}

/// Classify an error raised before the first row was produced.
pub(crate) fn open_error(e: sqlx::Error) -> ExtractError {
    if is_connection_error(&e) {
        ExtractError::Connection(e.to_string())
    } else {
        ExtractError::Query(e.to_string())
    }
}

/// Classify an error raised after rows started flowing.
pub(crate) fn read_error(e: sqlx::Error) -> ExtractError {
    ExtractError::Read(e.to_string())
}

pub(crate) fn storage_error(e: object_store::Error) -> ExtractError {
    ExtractError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlstate_classes() {
        assert!(is_connection_sqlstate("08006"));
        assert!(is_connection_sqlstate("28P01"));
        assert!(is_connection_sqlstate("3D000"));
        assert!(is_connection_sqlstate("57P01"));
        assert!(!is_connection_sqlstate("42883"));
        assert!(!is_connection_sqlstate("22007"));
    }

    #[test]
    fn test_pool_errors_are_connection_errors() {
        assert!(matches!(
            open_error(sqlx::Error::PoolTimedOut),
            ExtractError::Connection(_)
        ));
        assert!(matches!(
            open_error(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused"
            ))),
            ExtractError::Connection(_)
        ));
    }

    #[test]
    fn test_other_errors_before_first_row_are_query_errors() {
        assert!(matches!(
            open_error(sqlx::Error::RowNotFound),
            ExtractError::Query(_)
        ));
        assert!(matches!(
            open_error(sqlx::Error::Protocol("unexpected message".into())),
            ExtractError::Query(_)
        ));
    }

    #[test]
    fn test_read_and_storage_mapping() {
        assert!(matches!(
            read_error(sqlx::Error::PoolClosed),
            ExtractError::Read(_)
        ));
        let e = object_store::Error::NotImplemented;
        assert!(matches!(storage_error(e), ExtractError::Storage(_)));
    }

    #[test]
    fn test_connector_error_display() {
        let e = ConnectorError::UnsupportedUri("ftp://x".to_string());
        assert_eq!(e.to_string(), "unsupported URI: ftp://x");
    }
}
