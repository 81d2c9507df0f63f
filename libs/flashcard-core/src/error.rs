//! Error types for flashcard-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Input validation failures raised before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("grade must be 1 (hard), 2 (medium) or 3 (easy), got {0}")]
    InvalidGrade(i64),

    #[error("limit must be between {min} and {max}, got {value}")]
    InvalidLimit { value: i64, min: i64, max: i64 },
}

/// Check that `value` lies in `min..=max`.
pub fn validate_limit(value: i64, min: i64, max: i64) -> Result<usize> {
    if (min..=max).contains(&value) {
        Ok(value as usize)
    } else {
        Err(CoreError::InvalidLimit { value, min, max })
    }
}
