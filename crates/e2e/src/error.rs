//! Error types for gallery E2E runs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Driver exited: {0}")]
    DriverExited(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Cannot derive instance id from URL: {0}")]
    InvalidAppUrl(String),

    #[error("Control plane returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No valid projects found for this account")]
    NoProject,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Browser-side failures that polling loops retry through.
    pub fn is_transient(&self) -> bool {
        matches!(self, E2eError::Playwright(_) | E2eError::Timeout(_))
    }

    /// Failures reported by the control plane itself.
    pub fn is_api(&self) -> bool {
        matches!(self, E2eError::Api { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
