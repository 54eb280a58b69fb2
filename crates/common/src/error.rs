//! Error types shared across Certforge crates.

use std::path::PathBuf;

/// Top-level error type for Certforge operations.
#[derive(Debug, thiserror::Error)]
pub enum CertforgeError {
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Delivery error: {message}")]
    Delivery { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using CertforgeError.
pub type CertforgeResult<T> = Result<T, CertforgeError>;

impl CertforgeError {
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive {
            message: msg.into(),
        }
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery {
            message: msg.into(),
        }
    }

    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
