//! # Validation Utilities
//!
//! Input validation helpers.

use url::Url;

/// Validate that a string is not empty.
pub fn validate_not_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate that a URL parses, uses the http or https scheme and has a host part.
pub fn validate_http_url(value: &str, field_name: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", field_name, e))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{} must use http or https", field_name));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("{} is missing a host", field_name));
    }
    Ok(())
}

/// Validate that `value` lies within `min..=max`.
pub fn validate_range(value: u64, min: u64, max: u64, field_name: &str) -> Result<(), String> {
    if value < min || value > max {
        Err(format!("{} must be between {} and {}", field_name, min, max))
    } else {
        Ok(())
    }
}
