//! Error types for the barrier bridge.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for record store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for message bus operations.
pub type BusResult<T> = std::result::Result<T, BusError>;

/// Errors raised by a record store gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the database.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No row matched the lookup key.
    #[error("Barrier not found: {0}")]
    NotFound(String),

    /// The query itself failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// The store was closed.
    #[error("Record store is closed")]
    Closed,
}

/// Errors raised by a message bus gateway.
#[derive(Debug, Error)]
pub enum BusError {
    /// The broker refused or never acknowledged the connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No CONNACK within the connect timeout.
    #[error("Connection timeout after {0}ms")]
    Timeout(u64),

    /// Publishing a message failed.
    #[error("Publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    /// Subscribing to a topic failed.
    #[error("Subscribe to {topic} failed: {reason}")]
    Subscribe { topic: String, reason: String },

    /// The bus was disconnected.
    #[error("Message bus is disconnected")]
    Disconnected,
}

/// Configuration errors, all fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Umbrella error for the barrier bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// Record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Message bus failure.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error.
    #[error("Other: {0}")]
    Other(#[from] anyhow::Error),
}
