use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Screenshot error: {0}")]
    Screenshot(String),

    #[error("Timed out during {operation} after {elapsed:?}")]
    Timeout {
        operation: String,
        elapsed: Duration,
    },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl CaptureError {
    pub fn browser(message: impl Into<String>) -> Self {
        CaptureError::Browser(message.into())
    }

    pub fn timeout(operation: impl Into<String>, elapsed: Duration) -> Self {
        CaptureError::Timeout {
            operation: operation.into(),
            elapsed,
        }
    }

    /// Infrastructure failures worth another attempt. Configuration and
    /// serialization problems will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CaptureError::Io(_)
                | CaptureError::Browser(_)
                | CaptureError::Navigation(_)
                | CaptureError::Screenshot(_)
                | CaptureError::Timeout { .. }
        )
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            CaptureError::Io(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check output/cache directory paths and permissions.",
            ),
            CaptureError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Unknown,
                e.to_string(),
                "A browser probe returned unexpected data; rerun with --verbose for details.",
            ),
            CaptureError::InvalidUrl(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Verify URL/format (e.g., https://example.com).",
            ),
            CaptureError::Browser(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`).",
                    )
                } else if lower.contains("not found on path") || lower.contains("node command") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Install Node.js and ensure the node binary is on PATH, or switch to the chromium driver.",
                    )
                } else if lower.contains("executable") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Run `npx playwright install chromium` or set browser.chrome_path in the config.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Retry the capture; run headed (--headed) to watch the browser if it persists.",
                    )
                }
            }
            CaptureError::Navigation(msg) => ErrorPayload::new(
                ErrorCategory::Network,
                msg.to_string(),
                "Check connectivity and that the URL loads in a regular browser; consider raising --page-timeout.",
            ),
            CaptureError::Screenshot(msg) => ErrorPayload::new(
                ErrorCategory::Browser,
                msg.to_string(),
                "Very tall pages can exceed renderer limits; retry or capture a narrower viewport.",
            ),
            CaptureError::Timeout { .. } => ErrorPayload::new(
                ErrorCategory::Network,
                self.to_string(),
                "Try increasing --page-timeout or capture.launch_timeout, and ensure the page finishes loading.",
            ),
            CaptureError::Cache(msg) => ErrorPayload::new(
                ErrorCategory::Cache,
                msg.to_string(),
                "Run `pagecap cache clear` or point cache.dir at a writable directory.",
            ),
            CaptureError::Config(msg) => ErrorPayload::new(
                ErrorCategory::Config,
                msg.to_string(),
                "Check flags/paths (e.g., --viewport WIDTHxHEIGHT) and the config file.",
            ),
            CaptureError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Browser,
    Network,
    Io,
    Cache,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
