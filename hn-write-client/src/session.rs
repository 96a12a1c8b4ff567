//! In-memory holder for HN session cookies

use reqwest::Url;
use reqwest::header::HeaderValue;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Name of the cookie HN sets for a logged-in user
pub const USER_COOKIE: &str = "user";

const REDACTED_PREFIX: &str = "SecureSession(";
const MAX_VISIBLE_CHARS: usize = 8;

/// Authenticated HN session captured by an external login flow
///
/// Cookie values are wiped from memory when the session is dropped. Neither
/// `Debug` nor `Display` exposes them; both print the [`redacted`](Self::redacted)
/// token instead. A session cannot be modified once built, so rotating cookies
/// means constructing a new one.
///
/// # Example
///
/// ```
/// use hn_write_client::SecureSession;
///
/// let session = SecureSession::new([("user", "alice&0123456789abcdef")]);
/// assert!(session.has_valid_session());
/// assert_eq!(session.username(), Some("alice"));
/// assert!(!format!("{session:?}").contains("0123456789abcdef"));
/// ```
pub struct SecureSession {
    cookies: BTreeMap<String, Zeroizing<String>>,
}

impl SecureSession {
    /// Build a session from a cookie map
    ///
    /// Later duplicates of the same cookie name replace earlier ones.
    pub fn new<I, K, V>(cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let cookies = cookies
            .into_iter()
            .map(|(name, value)| (name.into(), Zeroizing::new(value.into())))
            .collect();
        Self { cookies }
    }

    /// Build a session from a `Cookie:` header string such as `user=alice&abc; lang=en`
    ///
    /// Pairs without a name are skipped; a pair without `=` is treated as a
    /// cookie with an empty value.
    pub fn from_cookie_header(header: &str) -> Self {
        let pairs = header.split(';').filter_map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        });
        Self::new(pairs)
    }

    /// True iff a non-empty `user` cookie is present
    pub fn has_valid_session(&self) -> bool {
        self.user_id().is_some()
    }

    /// Value of the `user` cookie
    pub fn user_id(&self) -> Option<&str> {
        self.cookies
            .get(USER_COOKIE)
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Account name, the part of the `user` cookie before its first `&`
    pub fn username(&self) -> Option<&str> {
        self.user_id()
            .and_then(|value| value.split('&').next())
            .filter(|name| !name.is_empty())
    }

    /// Number of cookies held
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Display token safe for logs: a fixed prefix plus a short prefix of the `user` cookie
    ///
    /// At most 8 characters are shown, and never more than half of the value.
    pub fn redacted(&self) -> String {
        match self.user_id() {
            Some(user) => {
                let total = user.chars().count();
                let shown: String = user.chars().take(MAX_VISIBLE_CHARS.min(total / 2)).collect();
                format!("{}user={}…)", REDACTED_PREFIX, shown)
            }
            None => format!("{}anonymous)", REDACTED_PREFIX),
        }
    }

    /// Build the raw `Cookie` header for a request to `target`
    ///
    /// Returns `None` unless `target` has exactly the same origin (scheme,
    /// host and port) as `origin`, the HN site the session belongs to. The
    /// header value is marked sensitive and the temporary string holding the
    /// cookies is zeroized before returning.
    pub fn dangerous_cookie_header_for(&self, target: &Url, origin: &Url) -> Option<HeaderValue> {
        if self.cookies.is_empty() || target.origin() != origin.origin() {
            return None;
        }

        let mut cookie_string = String::new();
        for (name, value) in &self.cookies {
            if !cookie_string.is_empty() {
                cookie_string.push_str("; ");
            }
            cookie_string.push_str(name);
            cookie_string.push('=');
            cookie_string.push_str(value);
        }

        let header_value = HeaderValue::from_bytes(cookie_string.as_bytes()).ok();
        cookie_string.zeroize();

        header_value.map(|mut value| {
            value.set_sensitive(true);
            value
        })
    }
}

impl fmt::Debug for SecureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Display for SecureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
