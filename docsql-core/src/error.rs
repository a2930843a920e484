//! Error types and result types for translation and execution.
//!
//! Two classifications are fatal for a translation pass and are kept apart on purpose:
//! [`DocSqlError::FeatureNotSupported`] means the input used a construct with no
//! translation rule, while [`DocSqlError::Assertion`] means an internal contract of the
//! translator was broken. Use [`DocSqlResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised while translating, rendering or executing a statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocSqlError {
    /// The relational statement uses a construct that has no translation rule.
    #[error("Feature not supported: {0}")]
    FeatureNotSupported(String),
    /// An internal invariant of the translator was violated.
    #[error("Assertion failed: {0}")]
    Assertion(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A table or column has no collection or field mapping.
    #[error("Metadata error: {0}")]
    Metadata(String),
    /// Bound parameter values do not fit the placeholders of a command.
    #[error("Parameter error: {0}")]
    Parameter(String),
    /// Configuration values are missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Error during executor initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// An error occurred in the executing backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocSqlError {
    /// Shorthand for a [`DocSqlError::FeatureNotSupported`] error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        DocSqlError::FeatureNotSupported(feature.into())
    }

    /// Shorthand for a [`DocSqlError::Assertion`] error.
    pub fn assertion(message: impl Into<String>) -> Self {
        DocSqlError::Assertion(message.into())
    }

    /// Returns `true` if the input used a construct that cannot be translated.
    pub fn is_feature_not_supported(&self) -> bool {
        matches!(self, DocSqlError::FeatureNotSupported(_))
    }

    /// Returns `true` if the error signals a translator defect.
    pub fn is_assertion(&self) -> bool {
        matches!(self, DocSqlError::Assertion(_))
    }
}

/// A specialized `Result` type for docsql operations.
pub type DocSqlResult<T> = Result<T, DocSqlError>;

/// Fails with an [`DocSqlError::Assertion`] unless `condition` holds.
pub fn assert_true(condition: bool, message: impl FnOnce() -> String) -> DocSqlResult<()> {
    if condition {
        Ok(())
    } else {
        Err(DocSqlError::Assertion(message()))
    }
}

impl From<BsonError> for DocSqlError {
    fn from(err: BsonError) -> Self {
        DocSqlError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocSqlError {
    fn from(err: SerdeJsonError) -> Self {
        DocSqlError::Serialization(err.to_string())
    }
}
