//! Error types for the CLI

use hn_write_client::{AuthError, ErrorCode};
use thiserror::Error;

/// Main CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client construction failed
    #[error("HTTP client error: {0}")]
    ClientInit(#[from] hn_write_client::ClientInitError),

    /// A write action was rejected or failed
    #[error("{} ({})", .0, .0.code())]
    Auth(#[from] AuthError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// What the user should do next, if anything specific
    pub fn hint(&self) -> Option<&'static str> {
        let CliError::Auth(err) = self else {
            return None;
        };
        Some(match err.code() {
            ErrorCode::NotLoggedIn => "log in again and refresh your cookies",
            ErrorCode::RateLimited => "slow down and try again in a minute",
            ErrorCode::InsufficientKarma => "this account cannot do that yet",
            ErrorCode::CaptchaRequired => "continue on news.ycombinator.com",
            ErrorCode::ParseError => "the page layout may have changed; check for an update",
            ErrorCode::NetworkError => "check your connection and retry",
        })
    }
}
