/// Error types for search, host collaborators and persistence
use thiserror::Error;

/// Failures of a single search request
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    /// The query is not a valid regular expression
    #[error("Invalid regex syntax: {0}")]
    InvalidPattern(String),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SearchError {
    /// Message sent back over the extension message channel
    pub fn wire_message(&self) -> String {
        match self {
            SearchError::InvalidPattern(_) => "Invalid regex syntax".to_string(),
            other => other.to_string(),
        }
    }
}

/// Failures reported by the browser-side collaborators
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    /// Message delivery to a tab failed (no content script listening)
    #[error("Tab {0} is unreachable")]
    Unreachable(i32),
    /// The page refuses content operations (browser internal pages)
    #[error("Cannot perform operations on browser internal pages")]
    Restricted,
    #[error("Browser API error: {0}")]
    Api(String),
}

/// Failures of the key-value persistence layer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}
