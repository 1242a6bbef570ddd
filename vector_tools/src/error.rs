//! Error types for vector_tools

use thiserror::Error;

/// Result type for vector_tools operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for vector_tools
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid field reference: {0}")]
    InvalidReference(String),

    #[error("Malformed data source: {0}")]
    MalformedSource(String),

    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    #[error("Missing connection parameters: {0}")]
    MissingParameters(String),

    #[error("Naming error: {0}")]
    NamingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convert Serde JSON errors to vector_tools errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to vector_tools errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Error::CsvError(error.to_string())
    }
}
