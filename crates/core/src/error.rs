//! Error types for readlater operations.
//!
//! This module defines [`ReadLaterError`], which covers page acquisition,
//! HTML handling, the page-context boundary, the AI advisor and the store.
//!
//! Most of these never reach the end user: the save pipeline recovers from
//! injection, selector, advisor and refinement failures locally and only
//! store failures propagate.
//!
//! # Example
//!
//! ```rust
//! use readlater_core::{ReadLaterError, Result};
//!
//! fn require_html(html: &str) -> Result<&str> {
//!     if html.is_empty() {
//!         return Err(ReadLaterError::HtmlParseError("empty document".to_string()));
//!     }
//!     Ok(html)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for readlater operations.
#[derive(Error, Debug)]
pub enum ReadLaterError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures, TLS problems and body decoding
    /// failures, both for page fetches and advisor calls.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML could not be handled, or a CSS selector failed to parse.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read/write errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// JSON encoding or decoding of stored records failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A task could not be run inside the page context.
    ///
    /// The in-browser equivalent is a script-injection failure; the save
    /// pipeline degrades to a URL and title only save.
    #[error("Page script injection failed: {0}")]
    Injection(String),

    /// The advisor endpoint answered with a non-success status.
    #[error("Advisor API error: {status} - {message}")]
    AdvisorStatus { status: u16, message: String },

    /// The advisor response could not be read as a suggestion.
    #[error("Malformed advisor response: {0}")]
    MalformedResponse(String),

    /// The advisor response carried no choices.
    #[error("Advisor response contained no choices")]
    NoChoices,

    /// Store backend failures other than I/O and JSON errors.
    #[error("Store error: {0}")]
    StoreError(String),
}

/// Result type alias for ReadLaterError.
pub type Result<T> = std::result::Result<T, ReadLaterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReadLaterError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_advisor_status_error() {
        let err = ReadLaterError::AdvisorStatus { status: 401, message: "Incorrect API key".to_string() };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[test]
    fn test_timeout_error() {
        let err = ReadLaterError::Timeout { timeout: 30 };
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_serialization_error_from() {
        let err: ReadLaterError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ReadLaterError::Serialization(_)));
    }
}
