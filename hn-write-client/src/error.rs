//! Error types for the HN write client

use std::fmt;
use thiserror::Error;

/// Closed set of failure causes for a write operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Session cookies are missing, expired, or rejected
    NotLoggedIn,
    /// The account lacks the karma required for the action
    InsufficientKarma,
    /// HN asked the client to slow down
    RateLimited,
    /// The page did not have the expected shape
    ParseError,
    /// HN requires a captcha or extra verification
    CaptchaRequired,
    /// Transport failure or non-2xx response
    NetworkError,
}

impl ErrorCode {
    /// Stable upper-case name of the code
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotLoggedIn => "NOT_LOGGED_IN",
            ErrorCode::InsufficientKarma => "INSUFFICIENT_KARMA",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::CaptchaRequired => "CAPTCHA_REQUIRED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
        }
    }

    /// Whether a later retry of the same call may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorCode::NetworkError)
    }

    /// Whether the caller should drop the session and log in again
    pub fn requires_relogin(self) -> bool {
        matches!(self, ErrorCode::NotLoggedIn)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every write operation
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AuthError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    /// Create an error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("Request failed ({})", code);
        }
        Self {
            code,
            message,
            source: None,
        }
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn not_logged_in(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotLoggedIn, message)
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::network(format!("HTTP request failed: {}", err)).with_source(err)
    }
}

/// Errors that can occur while building an [`HnClient`](crate::HnClient)
#[derive(Error, Debug)]
pub enum ClientInitError {
    /// The base URL could not be parsed
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[source] reqwest::Error),

    /// The base URL cannot carry paths (e.g. `data:` URLs)
    #[error("Base URL cannot be used as a base: {0}")]
    UnusableBaseUrl(String),

    /// The user agent is not a valid header value
    #[error("Invalid user agent: {0:?}")]
    InvalidUserAgent(String),

    /// The underlying HTTP client could not be constructed
    #[error("HTTP client initialization failed: {0}")]
    Http(#[source] reqwest::Error),
}
