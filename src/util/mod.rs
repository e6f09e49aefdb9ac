//! Shared utilities.
//!
//! Currently just security-focused URL validation, applied to the configured
//! feed URL before any network request is made.

mod url_validator;

pub use url_validator::{validate_url, UrlValidationError};
