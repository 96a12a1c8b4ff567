//! HN write client implementation

use crate::error::{AuthError, ClientInitError};
use crate::parser::{ActionKind, PageParser};
use crate::rate_limiter::RateLimiter;
use crate::session::SecureSession;
use reqwest::header::{COOKIE, HeaderValue, LOCATION, USER_AGENT};
use reqwest::{Method, Url};
use std::fmt;
use std::sync::Arc;

/// Default HN origin
pub const DEFAULT_BASE_URL: &str = "https://news.ycombinator.com";

/// Default `User-Agent` sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("hn-write-client/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 10;

/// Progress of a single write call, reported in debug logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    FetchingPage,
    TokenParsed,
    ActionSent,
    Success,
    Failed(crate::ErrorCode),
}

/// What a single round-trip produced
#[derive(Debug)]
enum Reply {
    Page(String),
    Redirect(Url),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::FetchingPage => f.write_str("FETCHING_PAGE"),
            Stage::TokenParsed => f.write_str("TOKEN_PARSED"),
            Stage::ActionSent => f.write_str("ACTION_SENT"),
            Stage::Success => f.write_str("SUCCESS"),
            Stage::Failed(code) => write!(f, "FAILED({})", code),
        }
    }
}

/// Authenticated write client for Hacker News
///
/// Every operation fetches the item page, scrapes a fresh single-use token
/// from it and then performs the action. Tokens are never cached. All
/// requests pass through the shared [`RateLimiter`] first.
///
/// # Example
///
/// ```no_run
/// use hn_write_client::{HnClient, SecureSession};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HnClient::new()?;
/// let session = SecureSession::from_cookie_header("user=alice&0123456789abcdef");
///
/// client.vote(42, &session)?;
/// client.comment(42, "Nice write-up!", &session)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HnClient {
    client: reqwest::blocking::Client,
    base_url: Url,
    user_agent: HeaderValue,
    rate_limiter: Arc<RateLimiter>,
    parser: Arc<PageParser>,
    allow_http: bool,
}

impl HnClient {
    /// Create a client for `https://news.ycombinator.com` with default settings
    pub fn new() -> Result<Self, ClientInitError> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> HnClientBuilder {
        HnClientBuilder::new()
    }

    /// Base URL all requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Upvote an item
    pub fn vote(&self, item_id: u64, session: &SecureSession) -> Result<(), AuthError> {
        self.perform(item_id, ActionKind::Upvote, session)
    }

    /// Remove a previous upvote
    pub fn unvote(&self, item_id: u64, session: &SecureSession) -> Result<(), AuthError> {
        self.perform(item_id, ActionKind::Unvote, session)
    }

    /// Add an item to the account's favorites
    pub fn favorite(&self, item_id: u64, session: &SecureSession) -> Result<(), AuthError> {
        self.perform(item_id, ActionKind::Favorite, session)
    }

    /// Remove an item from the account's favorites
    pub fn unfavorite(&self, item_id: u64, session: &SecureSession) -> Result<(), AuthError> {
        self.perform(item_id, ActionKind::Unfavorite, session)
    }

    /// Perform a link-based action on an item
    ///
    /// Fetches `/item?id=<item_id>`, extracts the action link and requests it.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] whose code tells the caller how to react; see
    /// [`ErrorCode`](crate::ErrorCode).
    pub fn perform(
        &self,
        item_id: u64,
        action: ActionKind,
        session: &SecureSession,
    ) -> Result<(), AuthError> {
        let span = tracing::debug_span!("hn_action", ?action, item_id, session = %session);
        let _guard = span.enter();

        let result = self.perform_inner(item_id, action, session);
        log_outcome(&result);
        result
    }

    fn perform_inner(
        &self,
        item_id: u64,
        action: ActionKind,
        session: &SecureSession,
    ) -> Result<(), AuthError> {
        tracing::debug!(stage = %Stage::FetchingPage);
        let html = self.fetch(self.item_url(item_id)?, session)?;

        let link = self.parser.parse_action_link(&html, item_id, action)?;
        let url = self.resolve_link(&link)?;
        tracing::debug!(stage = %Stage::TokenParsed, path = url.path());

        self.fetch(url, session)?;
        tracing::debug!(stage = %Stage::ActionSent);
        Ok(())
    }

    /// Post a reply to an item or comment
    ///
    /// Fetches the parent's page for the form HMAC, submits the comment and
    /// inspects the response for rejection messages.
    ///
    /// # Errors
    ///
    /// Blank `text` fails with `ParseError` before any request is made.
    /// Otherwise as for [`perform`](Self::perform).
    pub fn comment(
        &self,
        parent_id: u64,
        text: &str,
        session: &SecureSession,
    ) -> Result<(), AuthError> {
        let span = tracing::debug_span!("hn_comment", parent_id, session = %session);
        let _guard = span.enter();

        let result = self.comment_inner(parent_id, text, session);
        log_outcome(&result);
        result
    }

    fn comment_inner(
        &self,
        parent_id: u64,
        text: &str,
        session: &SecureSession,
    ) -> Result<(), AuthError> {
        if text.trim().is_empty() {
            return Err(AuthError::parse("Comment text cannot be empty"));
        }

        tracing::debug!(stage = %Stage::FetchingPage);
        let html = self.fetch(self.item_url(parent_id)?, session)?;

        let hmac = self.parser.parse_comment_hmac(&html)?;
        tracing::debug!(stage = %Stage::TokenParsed);

        let form = [
            ("parent", parent_id.to_string()),
            ("goto", format!("item?id={}", parent_id)),
            ("hmac", hmac),
            ("text", text.to_string()),
        ];
        let url = self.endpoint(&["comment"])?;
        match self.send(Method::POST, url, session, Some(&form[..]))? {
            Reply::Redirect(location) => {
                tracing::debug!(stage = %Stage::ActionSent, location = location.path());
                self.comment_redirect_outcome(parent_id, location, session)
            }
            Reply::Page(body) => {
                tracing::debug!(stage = %Stage::ActionSent, response_len = body.len());
                self.parser.classify_comment_response(&body)
            }
        }
    }

    /// HN redirects to `goto` once a comment is stored and re-renders the
    /// form in place when it rejects one.
    fn comment_redirect_outcome(
        &self,
        parent_id: u64,
        location: Url,
        session: &SecureSession,
    ) -> Result<(), AuthError> {
        if self.is_item_page(&location, parent_id)? {
            return Ok(());
        }
        if location.origin() == self.base_url.origin() && location.path() == "/login" {
            return Err(AuthError::not_logged_in(
                "Hacker News sent the comment to the login page; log in again",
            ));
        }

        let body = self.fetch(location, session)?;
        self.parser.classify_comment_response(&body)
    }

    fn is_item_page(&self, url: &Url, item_id: u64) -> Result<bool, AuthError> {
        let item_url = self.item_url(item_id)?;
        let item_id = item_id.to_string();
        Ok(url.origin() == item_url.origin()
            && url.path() == item_url.path()
            && url.query_pairs().any(|(name, value)| name == "id" && value == item_id.as_str()))
    }

    /// GET a page, following redirects one checked hop at a time
    fn fetch(&self, url: Url, session: &SecureSession) -> Result<String, AuthError> {
        let mut url = url;
        for _ in 0..=MAX_REDIRECTS {
            match self.send(Method::GET, url, session, None)? {
                Reply::Page(body) => return Ok(body),
                Reply::Redirect(next) => {
                    tracing::trace!(location = next.path(), "following redirect");
                    url = next;
                }
            }
        }
        Err(AuthError::network(format!(
            "Hacker News redirected more than {} times",
            MAX_REDIRECTS
        )))
    }

    /// The single path every request takes
    ///
    /// Rejects non-HTTPS targets before anything else, waits for the rate
    /// limiter, attaches the session cookies (same origin only) and the user
    /// agent. A 3xx comes back as its resolved `Location`; any other non-2xx
    /// status becomes `NetworkError`.
    fn send(
        &self,
        method: Method,
        url: Url,
        session: &SecureSession,
        form: Option<&[(&str, String)]>,
    ) -> Result<Reply, AuthError> {
        if url.scheme() != "https" && !self.allow_http {
            return Err(AuthError::network(format!(
                "Refusing to send a request over insecure {}://",
                url.scheme()
            )));
        }

        self.rate_limiter.throttle();

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(USER_AGENT, self.user_agent.clone());

        if let Some(cookie_header) = session.dangerous_cookie_header_for(&url, &self.base_url) {
            request = request.header(COOKIE, cookie_header);
        }

        if let Some(form) = form {
            request = request.form(form);
        }

        let span = tracing::trace_span!("hn_request", %method, path = url.path());
        let response = span.in_scope(|| request.send())?;

        let status = response.status();
        if status.is_redirection() {
            return redirect_location(&url, &response).map(Reply::Redirect);
        }
        if !status.is_success() {
            return Err(AuthError::network(format!(
                "Hacker News responded with HTTP {}",
                status
            )));
        }

        response
            .text()
            .map(Reply::Page)
            .map_err(|e| AuthError::network("Failed to read the Hacker News response").with_source(e))
    }

    fn item_url(&self, item_id: u64) -> Result<Url, AuthError> {
        let mut url = self.endpoint(&["item"])?;
        url.query_pairs_mut()
            .append_pair("id", &item_id.to_string());
        Ok(url)
    }

    /// Construct URL using path segments
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AuthError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| AuthError::network("Cannot modify base URL path"))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    /// Resolve a scraped link and make sure it stays on the HN origin
    fn resolve_link(&self, link: &str) -> Result<Url, AuthError> {
        let url = self.base_url.join(link).map_err(|e| {
            AuthError::parse(format!("Scraped action link is not a valid URL: {}", e))
        })?;
        if url.origin() != self.base_url.origin() {
            return Err(AuthError::parse(format!(
                "Scraped action link points outside Hacker News ({})",
                url.host_str().unwrap_or("unknown host")
            )));
        }
        Ok(url)
    }
}

fn redirect_location(url: &Url, response: &reqwest::blocking::Response) -> Result<Url, AuthError> {
    let status = response.status();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AuthError::network(format!(
                "Hacker News responded with HTTP {} without a Location",
                status
            ))
        })?;
    url.join(location)
        .map_err(|e| AuthError::network(format!("Invalid redirect location {:?}: {}", location, e)))
}

fn log_outcome(result: &Result<(), AuthError>) {
    match result {
        Ok(()) => tracing::debug!(stage = %Stage::Success),
        Err(e) => tracing::warn!(stage = %Stage::Failed(e.code()), error = %e, "write request failed"),
    }
}

/// Builder for configuring an [`HnClient`]
///
/// # Example
///
/// ```no_run
/// use hn_write_client::{HnClient, RateLimiter};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HnClient::builder()
///     .user_agent("my-reader/1.0")
///     .rate_limiter(Arc::new(RateLimiter::new()))
///     .client_builder(
///         reqwest::blocking::Client::builder()
///             .timeout(Duration::from_secs(10))
///     )
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HnClientBuilder {
    base_url: Option<Url>,
    client_builder: Option<reqwest::blocking::ClientBuilder>,
    user_agent: Option<String>,
    rate_limiter: Option<Arc<RateLimiter>>,
    parser: Option<PageParser>,
    allow_http: bool,
}

impl HnClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            base_url: None,
            client_builder: None,
            user_agent: None,
            rate_limiter: None,
            parser: None,
            allow_http: false,
        }
    }

    /// Set a custom base URL for the client
    ///
    /// Requests to a non-HTTPS base URL are refused at send time unless
    /// [`danger_allow_http`](Self::danger_allow_http) is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn base_url(mut self, url: impl reqwest::IntoUrl) -> Result<Self, ClientInitError> {
        self.base_url = Some(url.into_url().map_err(ClientInitError::InvalidBaseUrl)?);
        Ok(self)
    }

    /// Set a custom HTTP client builder
    ///
    /// Automatic redirects are always disabled on it. The client follows
    /// them itself so every hop is throttled and checked like any request.
    pub fn client_builder(mut self, builder: reqwest::blocking::ClientBuilder) -> Self {
        self.client_builder = Some(builder);
        self
    }

    /// Set the `User-Agent` header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Use a specific rate limiter instead of the process-wide one
    pub fn rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Use a parser with custom error rules
    pub fn parser(mut self, parser: PageParser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Allow plain-HTTP requests
    ///
    /// Only meant for talking to a local mock server in tests. Session
    /// cookies would otherwise travel unencrypted.
    pub fn danger_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Build the client with the configured settings
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry paths, the user agent is
    /// not a valid header value, or the HTTP client cannot be initialized.
    pub fn build(self) -> Result<HnClient, ClientInitError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| ClientInitError::UnusableBaseUrl(e.to_string()))?,
        };
        if base_url.cannot_be_a_base() {
            return Err(ClientInitError::UnusableBaseUrl(base_url.to_string()));
        }

        let user_agent = self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|_| ClientInitError::InvalidUserAgent(user_agent.to_string()))?;

        let builder = self
            .client_builder
            .unwrap_or_else(|| reqwest::blocking::Client::builder().use_rustls_tls());

        let client = builder
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ClientInitError::Http)?;

        Ok(HnClient {
            client,
            base_url,
            user_agent,
            rate_limiter: self.rate_limiter.unwrap_or_else(RateLimiter::shared),
            parser: Arc::new(self.parser.unwrap_or_default()),
            allow_http: self.allow_http,
        })
    }
}

impl Default for HnClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use mockito::Matcher;
    use proptest::prelude::*;

    const COOKIES: &str = "user=alice&0123456789abcdef";

    fn session() -> SecureSession {
        SecureSession::from_cookie_header(COOKIES)
    }

    fn client_for(server: &mockito::Server) -> HnClient {
        HnClient::builder()
            .base_url(server.url())
            .unwrap()
            .danger_allow_http(true)
            .rate_limiter(Arc::new(RateLimiter::new()))
            .build()
            .unwrap()
    }

    fn item_page(id: u64) -> String {
        format!(
            r#"<html><body><table><tr><td><center><a id="up_{id}" class="clicky" href="vote?id={id}&amp;how=up&amp;auth=tok{id}&amp;goto=item%3Fid%3D{id}"><div class="votearrow" title="upvote"></div></a></center></td></tr></table>
            <a id="fave_{id}" href="fave?id={id}&amp;auth=fav{id}">favorite</a>
            <form action="comment" method="post"><input type="hidden" name="parent" value="{id}"><input type="hidden" name="goto" value="item?id={id}"><input type="hidden" name="hmac" value="hmac{id}"><textarea name="text" rows="8" cols="80"></textarea><br><input type="submit" value="add comment"></form>
            <a href="logout?goto=item%3Fid%3D{id}">logout</a></body></html>"#
        )
    }

    fn err_code(result: Result<(), AuthError>) -> ErrorCode {
        result.expect_err("expected an error").code()
    }

    #[test]
    fn test_default_base_url() {
        let client = HnClient::builder()
            .rate_limiter(Arc::new(RateLimiter::new()))
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://news.ycombinator.com/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HnClient::builder().base_url("not a valid url").is_err());
    }

    #[test]
    fn test_vote_fetches_page_then_follows_link() {
        let mut server = mockito::Server::new();
        let page = server
            .mock("GET", "/item")
            .match_query(Matcher::UrlEncoded("id".into(), "42".into()))
            .match_header("cookie", COOKIES)
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .with_body(item_page(42))
            .expect(1)
            .create();
        let vote = server
            .mock("GET", "/vote")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "42".into()),
                Matcher::UrlEncoded("how".into(), "up".into()),
                Matcher::UrlEncoded("auth".into(), "tok42".into()),
            ]))
            .match_header("cookie", COOKIES)
            .with_status(200)
            .with_body("<html><body>ok</body></html>")
            .expect(1)
            .create();

        let client = client_for(&server);
        client.vote(42, &session()).unwrap();

        page.assert();
        vote.assert();
    }

    #[test]
    fn test_favorite_follows_fave_link() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(item_page(7))
            .create();
        let fave = server
            .mock("GET", "/fave")
            .match_query(Matcher::UrlEncoded("auth".into(), "fav7".into()))
            .with_status(200)
            .expect(1)
            .create();

        client_for(&server).favorite(7, &session()).unwrap();
        fave.assert();
    }

    #[test]
    fn test_logged_out_page_is_not_logged_in() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"<html><body><a href="login?goto=news">login</a></body></html>"#)
            .create();
        let vote = server
            .mock("GET", "/vote")
            .match_query(Matcher::Any)
            .expect(0)
            .create();

        let result = client_for(&server).unvote(42, &session());
        assert_eq!(err_code(result), ErrorCode::NotLoggedIn);
        vote.assert();
    }

    #[test]
    fn test_off_origin_link_is_refused() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"<a id="up_1" href="https://evil.example.com/vote?id=1&amp;how=up">x</a>"#)
            .create();

        let result = client_for(&server).vote(1, &session());
        assert_eq!(err_code(result), ErrorCode::ParseError);
    }

    #[test]
    fn test_comment_posts_form() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::UrlEncoded("id".into(), "42".into()))
            .with_status(200)
            .with_body(item_page(42))
            .create();
        let post = server
            .mock("POST", "/comment")
            .match_header("cookie", COOKIES)
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("parent".into(), "42".into()),
                Matcher::UrlEncoded("goto".into(), "item?id=42".into()),
                Matcher::UrlEncoded("hmac".into(), "hmac42".into()),
                Matcher::UrlEncoded("text".into(), "Nice & tidy".into()),
            ]))
            .with_status(200)
            .with_body("<html><body><span class=\"commtext\">Nice &amp; tidy</span></body></html>")
            .expect(1)
            .create();

        client_for(&server).comment(42, "Nice & tidy", &session()).unwrap();
        post.assert();
    }

    #[test]
    fn test_comment_insufficient_karma() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(item_page(42))
            .create();
        let _post = server
            .mock("POST", "/comment")
            .with_status(200)
            .with_body("<html><body>Sorry, insufficient karma to reply.</body></html>")
            .create();

        let result = client_for(&server).comment(42, "hello", &session());
        assert_eq!(err_code(result), ErrorCode::InsufficientKarma);
    }

    #[test]
    fn test_blank_comment_makes_no_request() {
        let mut server = mockito::Server::new();
        let page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .expect(0)
            .create();

        let result = client_for(&server).comment(42, "   \n", &session());
        assert_eq!(err_code(result), ErrorCode::ParseError);
        page.assert();
    }

    #[test]
    fn test_https_is_enforced_before_any_request() {
        let mut server = mockito::Server::new();
        let any = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create();
        let limiter = Arc::new(RateLimiter::new());
        let client = HnClient::builder()
            .base_url(server.url())
            .unwrap()
            .rate_limiter(Arc::clone(&limiter))
            .build()
            .unwrap();

        assert_eq!(err_code(client.vote(1, &session())), ErrorCode::NetworkError);
        assert_eq!(err_code(client.unfavorite(1, &session())), ErrorCode::NetworkError);
        assert_eq!(err_code(client.comment(1, "hi", &session())), ErrorCode::NetworkError);

        any.assert();
        // No throttle slot was consumed either
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_every_request_is_throttled() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(item_page(3))
            .create();
        let _vote = server
            .mock("GET", "/vote")
            .match_query(Matcher::Any)
            .with_status(200)
            .create();

        let limiter = Arc::new(RateLimiter::new());
        let client = HnClient::builder()
            .base_url(server.url())
            .unwrap()
            .danger_allow_http(true)
            .rate_limiter(Arc::clone(&limiter))
            .build()
            .unwrap();

        client.vote(3, &session()).unwrap();
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn test_cookies_not_sent_to_other_origins() {
        let server = mockito::Server::new();
        let other = mockito::Server::new();

        // Base URL on one server, request target on another
        let client = client_for(&server);
        let target = Url::parse(&format!("{}/item?id=5", other.url())).unwrap();
        assert!(
            session()
                .dangerous_cookie_header_for(&target, client.base_url())
                .is_none()
        );
    }

    #[test]
    fn test_comment_redirect_to_thread_is_success() {
        let mut server = mockito::Server::new();
        let thread = format!(
            "{}<span class=\"commtext\">Honestly I can't comment on the licensing side. Please slow down.</span>",
            item_page(42)
        );
        let page = server
            .mock("GET", "/item")
            .match_query(Matcher::UrlEncoded("id".into(), "42".into()))
            .with_status(200)
            .with_body(thread)
            .expect(1)
            .create();
        let post = server
            .mock("POST", "/comment")
            .with_status(302)
            .with_header("location", "/item?id=42")
            .expect(1)
            .create();

        client_for(&server).comment(42, "Thanks!", &session()).unwrap();

        post.assert();
        // The thread is not fetched again after the redirect
        page.assert();
    }

    #[test]
    fn test_comment_redirect_to_login_is_not_logged_in() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(item_page(42))
            .create();
        let _post = server
            .mock("POST", "/comment")
            .with_status(302)
            .with_header("location", "login?goto=item%3Fid%3D42")
            .create();

        let result = client_for(&server).comment(42, "hello", &session());
        assert_eq!(err_code(result), ErrorCode::NotLoggedIn);
    }

    #[test]
    fn test_comment_redirect_elsewhere_is_classified() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(item_page(42))
            .create();
        let _post = server
            .mock("POST", "/comment")
            .with_status(302)
            .with_header("location", "/x?fnid=abc")
            .create();
        let _expired = server
            .mock("GET", "/x")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html><body>Unknown or expired link.</body></html>")
            .create();

        let result = client_for(&server).comment(42, "hello", &session());
        assert_eq!(err_code(result), ErrorCode::NotLoggedIn);
    }

    #[test]
    fn test_vote_redirect_is_followed_and_throttled() {
        let mut server = mockito::Server::new();
        let page = server
            .mock("GET", "/item")
            .match_query(Matcher::UrlEncoded("id".into(), "42".into()))
            .match_header("cookie", COOKIES)
            .with_status(200)
            .with_body(item_page(42))
            .expect(2)
            .create();
        let _vote = server
            .mock("GET", "/vote")
            .match_query(Matcher::Any)
            .with_status(302)
            .with_header("location", "item?id=42")
            .create();

        let limiter = Arc::new(RateLimiter::new());
        let client = HnClient::builder()
            .base_url(server.url())
            .unwrap()
            .danger_allow_http(true)
            .rate_limiter(Arc::clone(&limiter))
            .build()
            .unwrap();

        client.vote(42, &session()).unwrap();
        page.assert();
        assert_eq!(limiter.len(), 3);
    }

    #[test]
    fn test_redirect_loop_is_network_error() {
        let mut server = mockito::Server::new();
        let _page = server
            .mock("GET", "/item")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(item_page(42))
            .create();
        let _vote = server
            .mock("GET", "/vote")
            .match_query(Matcher::Any)
            .with_status(302)
            .with_header("location", "/vote?id=42&how=up&auth=again")
            .create();

        let result = client_for(&server).vote(42, &session());
        assert_eq!(err_code(result), ErrorCode::NetworkError);
    }

    // **Non-success status becomes NETWORK_ERROR on either round-trip**
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        #[test]
        fn prop_non_success_status_is_network_error(
            item_id in 1u64..10_000_000u64,
            status_code in prop::sample::select(vec![400, 401, 403, 404, 429, 500, 502, 503, 504]),
            fail_on_action in prop::bool::ANY,
        ) {
            let mut server = mockito::Server::new();
            let page_status = if fail_on_action { 200 } else { status_code };
            let _page = server
                .mock("GET", "/item")
                .match_query(Matcher::Any)
                .with_status(page_status)
                .with_body(item_page(item_id))
                .create();
            let _vote = server
                .mock("GET", "/vote")
                .match_query(Matcher::Any)
                .with_status(status_code)
                .create();

            let result = client_for(&server).vote(item_id, &session());
            let err = result.unwrap_err();
            prop_assert_eq!(err.code(), ErrorCode::NetworkError);
            prop_assert!(err.message().contains(&status_code.to_string()));
        }
    }
}
