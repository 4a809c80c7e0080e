//! # Error Types
//!
//! Error types for cropcog-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cropcog-core errors (this file)                                       │
//! │  └── CoreError        - Entity naming faults                           │
//! │                                                                         │
//! │  cropcog-db errors (separate crate)                                    │
//! │  ├── DbError          - Document store failures                        │
//! │  └── ConfigError      - Environment configuration failures             │
//! │                                                                         │
//! │  Flow: CoreError → ConfigError → caller                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A collection name was rejected.
    ///
    /// ## When This Occurs
    /// - Empty override in configuration
    /// - Name contains `$` or a NUL byte
    /// - Name starts with `system.` (reserved by MongoDB)
    /// - Name longer than [`crate::MAX_COLLECTION_NAME_LEN`]
    #[error("Invalid collection name '{name}': {reason}")]
    InvalidCollectionName { name: String, reason: String },
}

impl CoreError {
    /// Creates an InvalidCollectionName error.
    pub fn invalid_collection(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidCollectionName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::invalid_collection("a$b", "must not contain '$'");
        assert_eq!(
            err.to_string(),
            "Invalid collection name 'a$b': must not contain '$'"
        );
    }
}
