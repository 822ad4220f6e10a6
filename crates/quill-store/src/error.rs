//! # Store Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error ───────────┐                                              │
//! │  reqwest::Error ────────┼──► StoreError (this module)                  │
//! │  non-2xx / bad JSON ────┤         │                                     │
//! │  {"status":"error"} ────┘         ▼                                     │
//! │                           LedgerError::Store / PartiallyApplied        │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                           CLI prints it, exits non-zero                │
//! │                                                                         │
//! │  Nothing here is retried automatically.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Entity store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response (DNS, refused, reset, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-2xx status.
    #[error("Remote returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The remote answered 2xx with something that is not the expected JSON.
    #[error("Malformed response from {context}: {detail}")]
    MalformedResponse { context: String, detail: String },

    /// The remote served an HTML page (login / permission screen).
    #[error("Remote denied access; check the endpoint is deployed for anyone: {0}")]
    AccessDenied(String),

    /// The remote reported an error object.
    #[error("Remote error: {0}")]
    Remote(String),

    /// An entity without an `id` was handed to `upsert`.
    #[error("{collection} item has no id")]
    MissingId { collection: String },

    /// A stored document does not decode into its domain type.
    #[error("Cannot decode {collection} document {id}: {message}")]
    Decode {
        collection: String,
        id: String,
        message: String,
    },

    /// A local blob is not a JSON array.
    #[error("Local collection '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database connection failed.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Database query failed: {0}")]
    Database(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sheet server failed to bind or run.
    #[error("Sheet server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl StoreError {
    pub fn malformed(context: impl Into<String>, detail: impl Into<String>) -> Self {
        StoreError::MalformedResponse {
            context: context.into(),
            detail: detail.into(),
        }
    }

    /// True for failures of the network hop itself (as opposed to data).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Transport(_) | StoreError::HttpStatus { .. } | StoreError::AccessDenied(_)
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::Database(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => StoreError::Database("Connection pool exhausted".into()),
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".into()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => StoreError::HttpStatus {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => StoreError::Transport(err.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
