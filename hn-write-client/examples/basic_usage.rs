//! Basic usage example for the HN write client
//!
//! This example demonstrates how to:
//! - Build a session from captured cookies
//! - Create a client with default settings
//! - Create a client with custom HTTP configuration
//! - Upvote an item and react to each error code
//!
//! Note: This example requires real news.ycombinator.com cookies to run.
//! Copy the `Cookie` header from a logged-in browser request into `HN_COOKIES`.

use hn_write_client::{ErrorCode, HnClient, SecureSession};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cookies = std::env::var("HN_COOKIES").expect("HN_COOKIES environment variable not set");
    let item_id: u64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1);

    let session = SecureSession::from_cookie_header(&cookies);
    if !session.has_valid_session() {
        println!("✗ No `user` cookie found; log in first");
        return Ok(());
    }
    println!("✓ Session loaded: {}", session);

    // Example 1: Default client (https://news.ycombinator.com)
    let _client = HnClient::new()?;

    // Example 2: Custom HTTP configuration
    let client = HnClient::builder()
        .user_agent("hn-example/0.1")
        .client_builder(
            reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(15))
                .use_rustls_tls(),
        )
        .build()?;

    println!("\nUpvoting item {}...", item_id);
    match client.vote(item_id, &session) {
        Ok(()) => println!("✓ Upvoted"),
        Err(e) => match e.code() {
            ErrorCode::NotLoggedIn => println!("✗ Session expired, log in again: {}", e),
            ErrorCode::RateLimited => println!("⏱ Too fast: {}", e),
            ErrorCode::InsufficientKarma | ErrorCode::CaptchaRequired => println!("✗ {}", e),
            ErrorCode::ParseError => println!("✗ Page layout changed? {}", e),
            ErrorCode::NetworkError => println!("✗ Network problem, try again: {}", e),
        },
    }

    Ok(())
}
