//! Shared parameter validation helpers.
//!
//! Small checks used by configuration types and detector builders to reject
//! bad values early with a uniform error shape.

use crate::core::errors::VisionError;

/// Validates that a value is finite (not NaN or infinite).
pub fn validate_finite(value: f32, name: &str) -> Result<(), VisionError> {
    if !value.is_finite() {
        return Err(VisionError::config_error_with_context(
            name,
            &value.to_string(),
            "must be a finite number",
        ));
    }
    Ok(())
}

/// Validates that a value lies within `[min, max]`.
pub fn validate_range(value: f32, min: f32, max: f32, name: &str) -> Result<(), VisionError> {
    validate_finite(value, name)?;
    if value < min || value > max {
        return Err(VisionError::config_error_with_context(
            name,
            &value.to_string(),
            &format!("must be within [{min}, {max}]"),
        ));
    }
    Ok(())
}

/// Validates that a value is strictly positive.
pub fn validate_positive<T: PartialOrd + Default + std::fmt::Display>(
    value: T,
    name: &str,
) -> Result<(), VisionError> {
    if value <= T::default() {
        return Err(VisionError::config_error_with_context(
            name,
            &value.to_string(),
            "must be greater than 0",
        ));
    }
    Ok(())
}

/// Validates that a slice is not empty.
pub fn validate_non_empty<T>(values: &[T], name: &str) -> Result<(), VisionError> {
    if values.is_empty() {
        return Err(VisionError::invalid_input(format!("{name} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite(1.0, "test").is_ok());
        assert!(validate_finite(0.0, "test").is_ok());
        assert!(validate_finite(-1.0, "test").is_ok());
        assert!(validate_finite(f32::NAN, "test").is_err());
        assert!(validate_finite(f32::INFINITY, "test").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(0.5, 0.0, 1.0, "test").is_ok());
        assert!(validate_range(0.0, 0.0, 1.0, "test").is_ok());
        assert!(validate_range(1.0, 0.0, 1.0, "test").is_ok());
        assert!(validate_range(-0.1, 0.0, 1.0, "test").is_err());
        assert!(validate_range(1.1, 0.0, 1.0, "test").is_err());
        assert!(validate_range(f32::NAN, 0.0, 1.0, "test").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(1.0f32, "test").is_ok());
        assert!(validate_positive(0.0f32, "test").is_err());
        assert!(validate_positive(-1.0f32, "test").is_err());
        assert!(validate_positive(3usize, "test").is_ok());
        assert!(validate_positive(0usize, "test").is_err());
    }

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty(&[1, 2, 3], "test").is_ok());
        assert!(validate_non_empty::<u8>(&[], "test").is_err());
    }
}
