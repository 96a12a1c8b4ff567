//! HTML scraping of HN pages: action links, comment HMAC, and error detection
//!
//! All knowledge of HN's markup lives here. Everything outside this module
//! only sees extracted tokens or an [`AuthError`] with a specific code.

use crate::error::{AuthError, ErrorCode};
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::sync::OnceLock;

/// Longest inline validation message surfaced verbatim
const MAX_MARKER_MESSAGE_CHARS: usize = 200;

const GENERIC_COMMENT_REJECTION: &str =
    "Hacker News did not accept the comment. Please try posting it on the website.";

/// State-changing action reachable through a link on an item page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Upvote,
    Unvote,
    Favorite,
    Unfavorite,
}

impl ActionKind {
    /// Prefix of the anchor id HN renders for this action, e.g. `up` in `up_42`
    pub fn anchor_prefix(self) -> &'static str {
        match self {
            ActionKind::Upvote => "up",
            ActionKind::Unvote => "un",
            ActionKind::Favorite => "fave",
            ActionKind::Unfavorite => "unfave",
        }
    }

    /// Value of the `how=` parameter in a `vote?` link
    ///
    /// Only votes have one, so only votes get the raw-text fallback.
    pub fn how_code(self) -> Option<&'static str> {
        match self {
            ActionKind::Upvote => Some("up"),
            ActionKind::Unvote => Some("un"),
            ActionKind::Favorite | ActionKind::Unfavorite => None,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ActionKind::Upvote => "upvote",
            ActionKind::Unvote => "unvote",
            ActionKind::Favorite => "favorite",
            ActionKind::Unfavorite => "unfavorite",
        }
    }

    fn anchor_key(self, item_id: u64) -> String {
        format!("{}_{}", self.anchor_prefix(), item_id)
    }
}

/// Ordered keyword rules mapping page text to an error code
///
/// Rules are checked in insertion order against lowercased text and the
/// first rule with a matching keyword wins.
#[derive(Debug, Clone, Default)]
pub struct ErrorRules {
    rules: Vec<ErrorRule>,
}

#[derive(Debug, Clone)]
struct ErrorRule {
    code: ErrorCode,
    keywords: Vec<String>,
    message: String,
}

impl ErrorRules {
    /// An empty rule set that never classifies anything
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule; keywords are matched case-insensitively
    pub fn rule(mut self, code: ErrorCode, keywords: &[&str], message: impl Into<String>) -> Self {
        self.rules.push(ErrorRule {
            code,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            message: message.into(),
        });
        self
    }

    /// Rules applied to an item page that lacks the expected token
    pub fn page_defaults() -> Self {
        Self::new()
            .rule(
                ErrorCode::NotLoggedIn,
                &["login"],
                "You need to be logged in to Hacker News to do this",
            )
            .rule(
                ErrorCode::InsufficientKarma,
                &["karma"],
                "Your account does not have enough karma for this action",
            )
            .rule(
                ErrorCode::RateLimited,
                &["slow down", "too fast"],
                "Hacker News says you are going too fast; slow down and try again later",
            )
            .rule(
                ErrorCode::CaptchaRequired,
                &["captcha", "verify"],
                "Hacker News requires extra verification; continue on the website",
            )
    }

    /// Rules applied to the response of a comment submission
    pub fn comment_defaults() -> Self {
        Self::new()
            .rule(
                ErrorCode::NotLoggedIn,
                &["unknown or expired", "bad login"],
                "Your Hacker News session has expired; log in again",
            )
            .rule(
                ErrorCode::RateLimited,
                &["submitting too fast", "slow down"],
                "You are submitting too fast; wait a bit before commenting again",
            )
            .rule(
                ErrorCode::InsufficientKarma,
                &["insufficient karma", "can't comment"],
                "Your account cannot comment yet (insufficient karma)",
            )
            .rule(
                ErrorCode::ParseError,
                &["blank", "empty comment"],
                "Hacker News rejected the comment as empty",
            )
    }

    /// First matching rule for already-lowercased text
    pub fn classify(&self, lowercase_text: &str) -> Option<(ErrorCode, &str)> {
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lowercase_text.contains(k.as_str())))
            .map(|rule| (rule.code, rule.message.as_str()))
    }
}

/// Scraper for HN pages with configurable error rules and cached patterns
#[derive(Clone, Debug)]
pub struct PageParser {
    page_rules: ErrorRules,
    comment_rules: ErrorRules,
    anchor_selector: OnceLock<Selector>,
    input_selector: OnceLock<Selector>,
    vote_path_regex: OnceLock<Regex>,
    marker_regex: OnceLock<Regex>,
}

impl PageParser {
    /// Create a parser with the default keyword rules
    pub fn new() -> Self {
        Self::with_rules(ErrorRules::page_defaults(), ErrorRules::comment_defaults())
    }

    /// Create a parser with custom keyword rules
    pub fn with_rules(page_rules: ErrorRules, comment_rules: ErrorRules) -> Self {
        Self {
            page_rules,
            comment_rules,
            anchor_selector: OnceLock::new(),
            input_selector: OnceLock::new(),
            vote_path_regex: OnceLock::new(),
            marker_regex: OnceLock::new(),
        }
    }

    fn anchor_selector(&self) -> &Selector {
        self.anchor_selector
            .get_or_init(|| Selector::parse("a[id]").unwrap())
    }

    fn input_selector(&self) -> &Selector {
        self.input_selector
            .get_or_init(|| Selector::parse("input[name]").unwrap())
    }

    fn vote_path_regex(&self) -> &Regex {
        self.vote_path_regex
            .get_or_init(|| Regex::new(r#"(?i)vote\?[^"'\s<>]+"#).unwrap())
    }

    /// Orange `<font>`/`<span>` directly before the comment textarea
    ///
    /// The message is plain text and ends at the marker's own closing tag.
    fn marker_regex(&self) -> &Regex {
        self.marker_regex.get_or_init(|| {
            Regex::new(
                r#"(?is)<(?:font|span)\b[^>]*color\s*[=:]\s*["']?#ff6600[^>]*>(?P<message>[^<]*)</(?:font|span)>\s*(?:<br\s*/?>\s*|</?p>\s*)*<textarea"#,
            )
            .unwrap()
        })
    }

    /// Extract the link for `action` on item `item_id`
    ///
    /// Looks for an anchor with id `<prefix>_<item_id>` (or a compound id
    /// starting with it) and returns its decoded `href`. Votes fall back to a
    /// scan of the raw HTML for a matching `vote?` path. When nothing is found
    /// the visible page text is classified with the page rules.
    pub fn parse_action_link(
        &self,
        html: &str,
        item_id: u64,
        action: ActionKind,
    ) -> Result<String, AuthError> {
        let document = Html::parse_document(html);
        let key = action.anchor_key(item_id);

        if let Some(href) = self.find_anchor_href(&document, &key) {
            return Ok(href);
        }

        if let Some(how) = action.how_code()
            && let Some(path) = self.find_vote_path(html, item_id, how)
        {
            return Ok(path);
        }

        let text = visible_text(&document);
        Err(match self.page_rules.classify(&text) {
            Some((code, message)) => AuthError::new(code, message),
            None => AuthError::parse(format!(
                "Could not find the {} link for item {}; the Hacker News page layout may have changed",
                action.describe(),
                item_id
            )),
        })
    }

    /// Extract the `hmac` value from the comment form of an item page
    pub fn parse_comment_hmac(&self, html: &str) -> Result<String, AuthError> {
        let document = Html::parse_document(html);

        let hmac = document.select(self.input_selector()).find_map(|input| {
            let element = input.value();
            let name = element.attr("name")?.trim();
            if !name.eq_ignore_ascii_case("hmac") {
                return None;
            }
            let value = element.attr("value")?.trim();
            (!value.is_empty()).then(|| value.to_string())
        });

        if let Some(hmac) = hmac {
            return Ok(hmac);
        }

        if visible_text(&document).contains("login") {
            Err(AuthError::not_logged_in(
                "You need to be logged in to Hacker News to comment",
            ))
        } else {
            Err(AuthError::parse(
                "Could not find the comment form; the Hacker News page layout may have changed",
            ))
        }
    }

    /// Decide whether the response to a comment submission is a rejection
    ///
    /// Keyword rules run first, then the inline validation marker HN shows
    /// above the textarea when it re-renders the form instead of redirecting.
    /// A response with neither is a success.
    pub fn classify_comment_response(&self, html: &str) -> Result<(), AuthError> {
        let document = Html::parse_document(html);
        let text = visible_text(&document);

        if let Some((code, message)) = self.comment_rules.classify(&text) {
            return Err(AuthError::new(code, message));
        }

        if let Some(captures) = self.marker_regex().captures(html) {
            let message = captures
                .name("message")
                .map(|m| fragment_text(m.as_str()))
                .filter(|m| !m.is_empty() && m.chars().count() <= MAX_MARKER_MESSAGE_CHARS);
            return Err(AuthError::parse(
                message.unwrap_or_else(|| GENERIC_COMMENT_REJECTION.to_string()),
            ));
        }

        Ok(())
    }

    fn find_anchor_href(&self, document: &Html, key: &str) -> Option<String> {
        let compound = format!("{}_", key);
        document.select(self.anchor_selector()).find_map(|anchor| {
            let element = anchor.value();
            let id = element.attr("id")?.trim().to_ascii_lowercase();
            if id != key && !id.starts_with(&compound) {
                return None;
            }
            // Attribute values come back entity-decoded from the HTML parser
            let href = element.attr("href")?.trim();
            (!href.is_empty()).then(|| href.to_string())
        })
    }

    fn find_vote_path(&self, html: &str, item_id: u64, how: &str) -> Option<String> {
        let item_id = item_id.to_string();
        self.vote_path_regex()
            .find_iter(html)
            .map(|m| decode_entities(m.as_str()))
            .find(|path| {
                let Some((_, query)) = path.split_once('?') else {
                    return false;
                };
                let mut has_item = false;
                let mut has_how = false;
                for (name, value) in query.split('&').filter_map(|pair| pair.split_once('=')) {
                    match name {
                        "id" | "for" if value == item_id => has_item = true,
                        "how" if value.eq_ignore_ascii_case(how) => has_how = true,
                        _ => {}
                    }
                }
                has_item && has_how
            })
    }
}

impl Default for PageParser {
    fn default() -> Self {
        Self::new()
    }
}

fn default_parser() -> &'static PageParser {
    static PARSER: OnceLock<PageParser> = OnceLock::new();
    PARSER.get_or_init(PageParser::new)
}

/// Extract the upvote link for `item_id`
pub fn parse_vote_link(html: &str, item_id: u64) -> Result<String, AuthError> {
    parse_action_link(html, item_id, ActionKind::Upvote)
}

/// Extract the unvote link for `item_id`
pub fn parse_unvote_link(html: &str, item_id: u64) -> Result<String, AuthError> {
    parse_action_link(html, item_id, ActionKind::Unvote)
}

/// Extract the favorite link for `item_id`
pub fn parse_favorite_link(html: &str, item_id: u64) -> Result<String, AuthError> {
    parse_action_link(html, item_id, ActionKind::Favorite)
}

/// Extract the unfavorite link for `item_id`
pub fn parse_unfavorite_link(html: &str, item_id: u64) -> Result<String, AuthError> {
    parse_action_link(html, item_id, ActionKind::Unfavorite)
}

/// Extract the link for any [`ActionKind`] using the default rules
pub fn parse_action_link(html: &str, item_id: u64, action: ActionKind) -> Result<String, AuthError> {
    default_parser().parse_action_link(html, item_id, action)
}

/// Extract the comment-form HMAC using the default rules
pub fn parse_comment_hmac(html: &str) -> Result<String, AuthError> {
    default_parser().parse_comment_hmac(html)
}

/// Classify a comment submission response using the default rules
pub fn classify_comment_response(html: &str) -> Result<(), AuthError> {
    default_parser().classify_comment_response(html)
}

/// Lowercased text a browser would render, whitespace collapsed and script
/// and style contents dropped
fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|element| matches!(element.name(), "script" | "style" | "noscript"));
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Text content of an HTML fragment with whitespace collapsed
fn fragment_text(fragment: &str) -> String {
    let fragment = Html::parse_fragment(fragment);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the entities HN uses inside attribute values
fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
