use thiserror::Error;

/// Top-level error type for the Courier system.
///
/// The first three variants are the distinct failure kinds exposed to
/// callers: invalid query parameters, references to entities that do not
/// exist, and failures of an upstream collaborator (persistent store,
/// contact directory, connectivity source). The remainder cover ambient
/// concerns shared by every crate in the workspace.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourierError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CourierError {
    fn from(err: toml::de::Error) -> Self {
        CourierError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CourierError {
    fn from(err: toml::ser::Error) -> Self {
        CourierError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        CourierError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Courier operations.
pub type Result<T> = std::result::Result<T, CourierError>;
