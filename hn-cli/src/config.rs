//! Configuration resolution from CLI args

use crate::cli::{Args, Command};
use crate::error::CliError;
use hn_write_client::{HnClient, SecureSession};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Environment variable holding the session cookies as a `Cookie` header line
pub const COOKIES_ENV: &str = "HN_COOKIES";

/// Resolved runtime configuration
pub struct Config {
    /// Action to perform
    pub command: Command,
    /// Base URL of the site
    pub base_url: String,
    /// User agent override
    pub user_agent: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Authenticated session
    pub session: SecureSession,
}

impl Config {
    /// Build config from CLI args, resolving the session
    pub fn from_args(args: Args) -> Result<Self, CliError> {
        let cookie_file = args.cookie_file.as_deref().map(expand_tilde);
        let env_cookies = std::env::var(COOKIES_ENV).ok().map(Zeroizing::new);
        let session = resolve_session(cookie_file.as_deref(), env_cookies)?;

        Ok(Config {
            command: args.command,
            base_url: args.base_url,
            user_agent: args.user_agent,
            timeout: Duration::from_secs(args.timeout.max(1)),
            session,
        })
    }

    /// Build the HN client for this configuration
    pub fn client(&self) -> Result<HnClient, CliError> {
        let mut builder = HnClient::builder()
            .base_url(self.base_url.as_str())?
            .client_builder(
                reqwest::blocking::Client::builder()
                    .timeout(self.timeout)
                    .use_rustls_tls(),
            );
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        Ok(builder.build()?)
    }
}

/// Expand ~ to home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str()
        && (path_str.starts_with("~/") || path_str == "~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path_str.get(2..).unwrap_or(""));
    }
    path.to_path_buf()
}

/// Prompt user for their cookies without echoing them
fn prompt_cookies() -> Result<Zeroizing<String>, CliError> {
    println!("No {} set and no --cookie-file given.", COOKIES_ENV);
    let s = rpassword::prompt_password("Paste your news.ycombinator.com cookies: ")
        .map_err(|e| CliError::Config(format!("Failed to read cookies: {}", e)))?;
    Ok(Zeroizing::new(s))
}

/// Read the first non-empty, non-comment line of a cookie file
fn read_cookie_file(path: &Path) -> Result<Zeroizing<String>, CliError> {
    let contents = Zeroizing::new(std::fs::read_to_string(path)?);
    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Zeroizing::new(line.trim_start_matches("Cookie:").trim().to_string()))
        .ok_or_else(|| CliError::Config(format!("No cookies found in {}", path.display())))
}

/// Resolve the session: cookie file, then environment, then prompt
fn resolve_session(
    cookie_file: Option<&Path>,
    env_cookies: Option<Zeroizing<String>>,
) -> Result<SecureSession, CliError> {
    let cookies = match (cookie_file, env_cookies) {
        (Some(path), _) => read_cookie_file(path)?,
        (None, Some(cookies)) if !cookies.trim().is_empty() => cookies,
        (None, _) => prompt_cookies()?,
    };
    session_from_header(&cookies)
}

/// Parse a cookie header line, insisting on a logged-in `user` cookie
fn session_from_header(cookies: &str) -> Result<SecureSession, CliError> {
    let session = SecureSession::from_cookie_header(cookies);
    if !session.has_valid_session() {
        return Err(CliError::Config(
            "The cookies do not contain a `user` cookie; log in to Hacker News first".to_string(),
        ));
    }
    Ok(session)
}
