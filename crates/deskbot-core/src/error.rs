//! Structured errors shared across the automaton

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    ImageNotFound,
    UnsupportedPlatform,
    UnsupportedLanguage,
    CaptureFailed,
    CacheFailed,
    ExportNotFound,
    ActionFailed,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn image_not_found(path: &Path) -> Self {
        Self::new(
            ErrorCode::ImageNotFound,
            format!("No such image on disk: {}", path.display()),
        )
    }

    pub fn unsupported_platform(operation: &str, os: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedPlatform,
            format!("{} has no verified command for {}", operation, os),
        )
    }

    pub fn unsupported_language(language: &str, supported: &[&str]) -> Self {
        Self::new(
            ErrorCode::UnsupportedLanguage,
            format!("Recognition language not supported: {}", language),
        )
        .with_context(serde_json::json!({ "supported": supported }))
    }

    pub fn capture_failed(reason: &str) -> Self {
        Self::new(ErrorCode::CaptureFailed, format!("Capture failed: {}", reason))
    }

    pub fn export_not_found(project: &str) -> Self {
        Self::new(
            ErrorCode::ExportNotFound,
            format!("No recorded project: {}", project),
        )
    }

    pub fn action_failed(action: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::ActionFailed,
            format!("{} failed: {}", action, reason),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::new(ErrorCode::CacheFailed, e.to_string())
    }
}
