//! Error types for the bcdx service.

use thiserror::Error;

/// Core error type shared by every bcdx crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A startup artifact is missing or corrupt
    #[error("Failed to load artifact {path}: {reason}")]
    ArtifactLoad {
        /// Artifact path
        path: String,
        /// What went wrong
        reason: String,
    },

    /// A record key has no entry in the feature table
    #[error("Unmapped feature: {0:?}")]
    UnmappedFeature(String),

    /// A feature the scaler expects is absent from the record
    #[error("Missing feature: {0:?}")]
    MissingFeature(String),

    /// A user-supplied value is not a finite number
    #[error("Invalid numeric value for {field}: {value:?}")]
    NumericConversion {
        /// Field identifier
        field: String,
        /// Rejected input
        value: String,
    },

    /// The scaler's feature order is not a permutation of the feature table
    #[error("Feature order mismatch: {0}")]
    FeatureOrderMismatch(String),

    /// A vector or matrix has the wrong shape
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape
        expected: String,
        /// Actual shape
        actual: String,
    },

    /// Model inference error
    #[error("Model inference error: {0}")]
    ModelError(String),

    /// The classifier produced a value outside [0, 1]
    #[error("Invalid probability: {0}")]
    InvalidProbability(f64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an artifact load error for `path`
    pub fn artifact(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Error::ArtifactLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error violates the record contract (bad keys or values)
    /// rather than indicating a broken artifact or environment
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::UnmappedFeature(_)
                | Error::MissingFeature(_)
                | Error::NumericConversion { .. }
                | Error::SerializationError(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::ModelError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MissingFeature("mean radius".to_string());
        assert_eq!(err.to_string(), "Missing feature: \"mean radius\"");
    }

    #[test]
    fn test_artifact_error_names_path() {
        let err = Error::artifact("models/scaler.json", "No such file or directory");
        assert!(err.to_string().contains("models/scaler.json"));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_input_errors() {
        assert!(Error::UnmappedFeature("x".into()).is_input_error());
        assert!(Error::NumericConversion {
            field: "area_mean".into(),
            value: "abc".into()
        }
        .is_input_error());
        assert!(!Error::InvalidProbability(1.5).is_input_error());
    }
}
