//! Error types for Postdeck

use thiserror::Error;

use crate::types::PostStatus;

pub type Result<T> = std::result::Result<T, PostdeckError>;

#[derive(Error, Debug)]
pub enum PostdeckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Compose error: {0}")]
    Compose(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Post not found: {0}")]
    NotFound(i64),

    #[error("Post {id} is {actual}; this operation requires status {required}")]
    InvalidState {
        id: i64,
        actual: PostStatus,
        required: String,
    },
}

impl PostdeckError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PostdeckError::Validation(_)
            | PostdeckError::NotFound(_)
            | PostdeckError::InvalidState { .. } => 3,
            PostdeckError::Credential(_) => 2,
            PostdeckError::Publish(PublishError::Authentication(_)) => 2,
            PostdeckError::Publish(_) => 1,
            PostdeckError::Compose(_) => 1,
            PostdeckError::Config(_) => 1,
            PostdeckError::Database(_) => 1,
        }
    }

    /// True for errors caused by the caller (bad input, unknown id, wrong state)
    pub fn is_client_error(&self) -> bool {
        self.exit_code() == 3
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("Invalid credential name '{0}': use lowercase letters, digits, '-' or '_'")]
    InvalidName(String),

    #[error("OS keyring unavailable: {0}")]
    KeyringUnavailable(String),

    #[error("Keyring error: {0}")]
    Keyring(String),

    #[error("Failed to update key registry: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PublishError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rejected by validator: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote service returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Not configured: {0}")]
    NotConfigured(String),
}
