//! Error types for rk-core.

use thiserror::Error;

/// Result type alias using rk-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the resource manager or content graph.
#[derive(Error, Debug)]
pub enum Error {
    /// Knowledge node id is not present in the graph
    #[error("Knowledge node not found: {id}")]
    NodeNotFound { id: String },

    /// Tab id is not registered
    #[error("Tab not found: {tab_id}")]
    TabNotFound { tab_id: String },

    /// Process id is not registered
    #[error("Process not found: {process_id}")]
    ProcessNotFound { process_id: String },

    /// Tab id already registered and duplicates are rejected
    #[error("Tab already registered: {tab_id}")]
    DuplicateTab { tab_id: String },

    /// Caller supplied an argument the operation cannot accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Durable storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a node-not-found error.
    pub fn node_not_found(id: impl ToString) -> Self {
        Self::NodeNotFound { id: id.to_string() }
    }

    /// Create a tab-not-found error.
    pub fn tab_not_found(tab_id: impl Into<String>) -> Self {
        Self::TabNotFound {
            tab_id: tab_id.into(),
        }
    }

    /// Create a process-not-found error.
    pub fn process_not_found(process_id: impl Into<String>) -> Self {
        Self::ProcessNotFound {
            process_id: process_id.into(),
        }
    }

    /// True if this error reports a missing entity of any kind.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound { .. } | Self::TabNotFound { .. } | Self::ProcessNotFound { .. }
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(Error::node_not_found("abc").is_not_found());
        assert!(Error::tab_not_found("t1").is_not_found());
        assert!(Error::process_not_found("tab-t1").is_not_found());
        assert!(!Error::Storage("disk full".into()).is_not_found());
    }

    #[test]
    fn test_display() {
        let err = Error::DuplicateTab {
            tab_id: "t1".into(),
        };
        assert_eq!(err.to_string(), "Tab already registered: t1");
    }
}
