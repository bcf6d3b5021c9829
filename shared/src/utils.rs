//! # Shared Utility Functions
//!
//! ## Address Formatting
//!
//! Functions for shortening SS58 account addresses for display and logs:
//! - [`format_address`] - Format address with ellipsis (first N and last M characters)
//! - [`truncate_address`] - `format_address` with the default 4/4 split
//!
//! ```rust
//! use shared::utils::format_address;
//!
//! let address = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";
//! assert_eq!(format_address(address, 4, 4), "15oF...6Sp5");
//! ```

/// Format an address by showing the first `prefix_len` and last `suffix_len` characters.
///
/// Addresses too short to shorten meaningfully are returned as-is.
///
/// ```rust
/// use shared::utils::format_address;
///
/// let addr = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";
/// assert_eq!(format_address(addr, 6, 6), "15oF4u...Hr6Sp5");
/// assert_eq!(format_address("short", 4, 4), "short");
/// ```
pub fn format_address(address: &str, prefix_len: usize, suffix_len: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    let len = chars.len();

    if len <= prefix_len + suffix_len {
        return address.to_string();
    }

    let prefix: String = chars[..prefix_len].iter().collect();
    let suffix: String = chars[len - suffix_len..].iter().collect();

    format!("{}...{}", prefix, suffix)
}

/// [`format_address`] with a 4-character prefix and suffix.
pub fn truncate_address(address: &str) -> String {
    format_address(address, 4, 4)
}
