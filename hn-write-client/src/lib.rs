//! HN Write Client Library
//!
//! Authenticated write access to Hacker News through its HTML interface.
//! HN has no write API, so each action fetches the live item page, scrapes a
//! single-use token from it (vote/favorite links, comment-form HMAC), and
//! then replays it with the user's session cookies.
//!
//! # Features
//!
//! - Vote, unvote, favorite, unfavorite and comment
//! - [`SecureSession`] keeps cookies out of logs and zeroizes them on drop
//! - Mandatory client-side throttling through a shared [`RateLimiter`]
//! - Failures classified into a closed set of [`ErrorCode`]s
//! - HTTPS-only transport using rustls (no OpenSSL dependencies)
//! - Blocking synchronous API
//!
//! # Example
//!
//! ```no_run
//! use hn_write_client::{ErrorCode, HnClient, SecureSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HnClient::new()?;
//!
//! // Cookies captured by your login flow
//! let session = SecureSession::new([("user", "alice&0123456789abcdef")]);
//! if !session.has_valid_session() {
//!     return Ok(());
//! }
//!
//! match client.vote(42, &session) {
//!     Ok(()) => println!("Voted!"),
//!     Err(e) if e.code() == ErrorCode::NotLoggedIn => println!("Please log in again"),
//!     Err(e) if e.code() == ErrorCode::RateLimited => println!("Slow down"),
//!     Err(e) => println!("Vote failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod parser;
mod rate_limiter;
mod session;

pub use client::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HnClient, HnClientBuilder};
pub use error::{AuthError, ClientInitError, ErrorCode};
pub use parser::{
    ActionKind, ErrorRules, PageParser, classify_comment_response, parse_action_link,
    parse_comment_hmac, parse_favorite_link, parse_unfavorite_link, parse_unvote_link,
    parse_vote_link,
};
pub use rate_limiter::{Clock, DEFAULT_MAX_ACTIONS, DEFAULT_WINDOW, RateLimiter, SystemClock};
pub use session::{SecureSession, USER_COOKIE};
