//! Error types for Bandrule

use thiserror::Error;

/// Result type alias using Bandrule's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Bandrule operations
#[derive(Error, Debug)]
pub enum Error {
    /// A field the rule measures is missing from the event or data cache
    #[error("Measurement unavailable: {0}")]
    MeasurementUnavailable(String),

    /// The historical store errored, timed out or was cancelled
    #[error("Query failure: {0}")]
    QueryFailure(String),

    /// Classification was invoked without a measurement
    #[error("Value provided undefined, so cannot determine rule outcome")]
    UndefinedMeasurement,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rule configuration failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error outside of a history query
    #[error("Database error: {0}")]
    Database(String),

    /// Redis error
    #[error("Redis error: {0}")]
    Redis(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a measurement unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::MeasurementUnavailable(msg.into())
    }

    /// Create a query failure error
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryFailure(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error aborted an evaluation (as opposed to setup/IO)
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(
            self,
            Self::MeasurementUnavailable(_) | Self::QueryFailure(_) | Self::UndefinedMeasurement
        )
    }
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
