//! Validation errors for externally supplied data.
//!
//! The engine itself is total over well-formed inputs; these errors only guard
//! the boundary where items, containers and run parameters enter.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Validates a single dimension.
pub(crate) fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates all three dimensions of a box.
pub(crate) fn validate_dimensions_3d(
    dims: (f64, f64, f64),
    prefix: &str,
) -> Result<(), ValidationError> {
    validate_dimension(dims.0, &format!("{prefix} width"))?;
    validate_dimension(dims.1, &format!("{prefix} depth"))?;
    validate_dimension(dims.2, &format!("{prefix} height"))?;
    Ok(())
}

/// Validates a ratio in `[0, 1]`.
pub(crate) fn validate_ratio(value: f64, name: &str) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidThreshold(format!(
            "{} must be between 0 and 1, got: {}",
            name, value
        )));
    }
    Ok(())
}
