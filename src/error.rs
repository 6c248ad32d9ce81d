// src/error.rs

//! Unified error handling for the crawler application.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// State store read or write failed
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Browser engine failure (launch, CDP call, timeout)
    #[error("Browser error: {0}")]
    Browser(String),

    /// Menu, search or readiness probe exhausted its retries
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// No row selector matched, or a detail readiness probe failed
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A single notice failed somewhere between opening and persisting
    #[error("Detail failed for {notice_id}: {message}")]
    DetailItem { notice_id: String, message: String },

    /// Could not get back to the bid list, even by re-navigating
    #[error("Recovery failed: {0}")]
    Recovery(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a browser error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Create a navigation error.
    pub fn navigation(message: impl Into<String>) -> Self {
        Self::Navigation(message.into())
    }

    /// Create an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a per-notice error.
    pub fn detail_item(notice_id: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::DetailItem {
            notice_id: notice_id.into(),
            message: message.to_string(),
        }
    }

    /// Create a recovery error.
    pub fn recovery(message: impl Into<String>) -> Self {
        Self::Recovery(message.into())
    }

    /// Whether the error ends the whole run rather than one notice.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::DetailItem { .. } | Self::Extraction(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_item_is_not_fatal() {
        assert!(!AppError::detail_item("abc", "boom").is_fatal());
        assert!(!AppError::extraction("no rows").is_fatal());
    }

    #[test]
    fn test_navigation_and_storage_are_fatal() {
        assert!(AppError::navigation("menu").is_fatal());
        assert!(AppError::recovery("lost").is_fatal());
        assert!(AppError::config("mega_menu").is_fatal());
    }

    #[test]
    fn test_display_includes_context() {
        let err = AppError::detail_item("n-1", "timeout");
        assert_eq!(err.to_string(), "Detail failed for n-1: timeout");
    }
}
