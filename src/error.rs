//! Error handling for the query-state core
//!
//! This module provides idiomatic Rust error types using thiserror for
//! better error messages and proper error chain handling. Each subsystem
//! gets its own enum; faults that cross a subsystem boundary are chained
//! with `#[from]`.

use thiserror::Error;

/// Faults raised by a durable slot backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {message}")]
    Backend { message: String },
}

/// Faults raised while persisting or loading query snapshots
#[derive(Error, Debug)]
pub enum StoreError {
    /// Serialization of the live session failed. The write was skipped, so
    /// any previously stored snapshot is still intact.
    #[error("Failed to encode query snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    /// The stored value is not a well-formed snapshot envelope.
    #[error("Failed to decode stored query snapshot: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Storage error: {0}")]
    Slot(#[from] StorageError),
}

/// Faults raised by the query session itself
#[derive(Error, Debug)]
pub enum SessionError {
    /// The engine only accepts a JSON object as a query definition.
    #[error("Query payload is not loadable: expected a JSON object, found {found}")]
    UnloadablePayload { found: &'static str },
}

/// Faults raised while restoring a persisted session at startup
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Restore runs exactly once per coordinator.
    #[error("Restore already ran for this coordinator")]
    AlreadyRan,
}

/// Faults raised while building tenant routing from configuration
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Failed to read routing config {path}: {source}")]
    ReadConfig {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse routing config {path}: {source}")]
    ParseConfig {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid connection url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Result type aliases for convenience
pub type StoreResult<T> = Result<T, StoreError>;
pub type SessionResult<T> = Result<T, SessionError>;
pub type RestoreResult<T> = Result<T, RestoreError>;
pub type RoutingResult<T> = Result<T, RoutingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_chains_into_store_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::from(StorageError::from(io));
        assert!(matches!(err, StoreError::Slot(StorageError::Io(_))));
    }

    #[test]
    fn test_session_error_chains_into_restore_error() {
        let err = RestoreError::from(SessionError::UnloadablePayload { found: "array" });
        assert!(matches!(err, RestoreError::Session(_)));
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_decode_error_message_names_the_snapshot() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = StoreError::Decode(bad);
        assert!(err.to_string().starts_with("Failed to decode"));
    }

    #[test]
    fn test_routing_error_display() {
        let err = RoutingError::InvalidUrl {
            url: "mysql://nope".to_string(),
            reason: "unsupported scheme".to_string(),
        };
        assert!(err.to_string().contains("unsupported scheme"));
    }
}
