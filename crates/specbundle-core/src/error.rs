//! Error handling for the specbundle library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! # Examples
//!
//! ```
//! use specbundle_core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::config("GITHUB_PAT is not set"))
//! }
//!
//! assert!(might_fail().is_err());
//! ```

use thiserror::Error;

/// Result type for bundle assembly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bundle assembly operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failure (connection refused, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Fragment payload was not valid base64
    #[error("Could not decode fragment content: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The remote host answered with a non-success status
    #[error("Could not retrieve file from remote {path} (HTTP {status}): {body}")]
    Fetch {
        path: String,
        status: u16,
        body: String,
    },

    /// Configuration error, including a missing credential
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or unknown bundle plan
    #[error("Plan error: {0}")]
    Plan(String),

    /// A fragment could not be treated as a structured document
    #[error("Document error: {0}")]
    Document(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new plan error
    pub fn plan<S: Into<String>>(msg: S) -> Self {
        Self::Plan(msg.into())
    }

    /// Create a new document error
    pub fn document<S: Into<String>>(msg: S) -> Self {
        Self::Document(msg.into())
    }

    /// Whether this error was raised before any network call could happen.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Plan(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_names_path() {
        let err = Error::Fetch {
            path: "components/common.yaml".into(),
            status: 404,
            body: "Not Found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("components/common.yaml"));
        assert!(msg.contains("404"));
        assert!(!err.is_config());
    }

    #[test]
    fn test_config_helpers() {
        assert!(Error::config("missing").is_config());
        assert!(Error::plan("unknown").is_config());
        assert!(!Error::document("bad").is_config());
    }
}
