//! Error types for the workout_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for workout_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blueprint failed validation at load time
    #[error("Blueprint validation error: {0}")]
    BlueprintValidation(String),

    /// No blueprint registered under the requested archetype id
    #[error("Unknown blueprint: {0}")]
    UnknownBlueprint(String),

    /// The exercise catalog could not be queried; generation is aborted
    #[error("Exercise catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Profile store, shared matrix or request tracker failure
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    /// Whether a failed generation attempt can simply be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CatalogUnavailable(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_failures_are_retryable() {
        assert!(Error::CatalogUnavailable("timeout".into()).is_retryable());
        assert!(Error::Io(io::Error::new(io::ErrorKind::Interrupted, "eintr")).is_retryable());

        assert!(!Error::UnknownBlueprint("x".into()).is_retryable());
        assert!(!Error::BlueprintValidation("x".into()).is_retryable());
        assert!(!Error::Config("x".into()).is_retryable());
    }
}
