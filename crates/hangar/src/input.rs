//! Normalization of user-supplied fields.

use crate::error::{Error, Result};

/// Trim a required text field, rejecting blanks.
pub(crate) fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blanks become `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reject negative or non-finite quantities such as hours or prices.
pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid_input(
            field,
            format!("must be a non-negative number, got {value}"),
        ));
    }
    Ok(value)
}
