//! Channel reference classification
//!
//! A channel reference is whatever the user put in the channel list: a
//! channel URL, an `@handle`, a legacy `/user/` or `/c/` URL, a bare channel
//! id or a free-text name. Classification is purely structural; no remote
//! call happens here.
//!
//! Matchers run in a fixed priority order: canonical id, handle, username,
//! vanity path. Anything left over becomes a free-text search term.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::fmt;

/// Identifier errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// Reference is empty after trimming
    #[error("channel reference cannot be empty")]
    Empty,
}

/// Structural form of a channel reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelRefKind {
    /// Already a canonical `UC...` id
    CanonicalId(String),
    /// `@handle`, stored with its leading `@`
    Handle(String),
    /// Legacy `/user/<name>`
    Username(String),
    /// Custom `/c/<name>` or bare `/<name>` path
    VanityPath(String),
    /// Anything else, searched as text
    FreeText(String),
}

impl ChannelRefKind {
    /// Short name of the lookup strategy, used in logs and reports
    pub fn strategy(&self) -> &'static str {
        match self {
            ChannelRefKind::CanonicalId(_) => "canonical-id",
            ChannelRefKind::Handle(_) => "handle",
            ChannelRefKind::Username(_) => "username",
            ChannelRefKind::VanityPath(_) => "vanity",
            ChannelRefKind::FreeText(_) => "search",
        }
    }

    /// The value handed to the lookup strategy
    pub fn value(&self) -> &str {
        match self {
            ChannelRefKind::CanonicalId(v)
            | ChannelRefKind::Handle(v)
            | ChannelRefKind::Username(v)
            | ChannelRefKind::VanityPath(v)
            | ChannelRefKind::FreeText(v) => v,
        }
    }
}

/// A raw channel reference together with its classification
///
/// # Examples
///
/// ```
/// use channel_stats_harvester::identifier::{ChannelRef, ChannelRefKind};
///
/// let r = ChannelRef::parse("https://www.youtube.com/@SomeCreator/videos").unwrap();
/// assert_eq!(r.kind(), &ChannelRefKind::Handle("@SomeCreator".to_string()));
/// assert_eq!(r.raw(), "https://www.youtube.com/@SomeCreator/videos");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    raw: String,
    kind: ChannelRefKind,
}

static CHANNEL_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^channel/(UC[\w-]{20,})").expect("channel path pattern is valid")
});
static BARE_CHANNEL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^UC[\w-]{22}$").expect("channel id pattern is valid"));
static HANDLE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(@[^/?#\s]+)").expect("handle pattern is valid"));
static USER_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^user/([^/?#\s]+)").expect("user pattern is valid"));
static VANITY_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:c/)?([^/?#\s@]+)").expect("vanity pattern is valid"));

/// Path segments that belong to the site itself, never to a channel
const RESERVED_PATHS: &[&str] = &[
    "watch", "results", "feed", "playlist", "shorts", "live", "embed", "channel", "user",
];

type Matcher = fn(&Target<'_>) -> Option<ChannelRefKind>;

/// Ordered matcher list; the first match wins
const MATCHERS: &[(&str, Matcher)] = &[
    ("canonical-id", match_canonical_id),
    ("handle", match_handle),
    ("username", match_username),
    ("vanity", match_vanity),
];

/// What the matchers look at
struct Target<'a> {
    raw: &'a str,
    /// Decoded URL path without the leading slash, when the input is a URL
    path: Option<String>,
}

fn match_canonical_id(target: &Target<'_>) -> Option<ChannelRefKind> {
    if BARE_CHANNEL_ID.is_match(target.raw) {
        return Some(ChannelRefKind::CanonicalId(target.raw.to_string()));
    }
    let path = target.path.as_deref()?;
    CHANNEL_PATH
        .captures(path)
        .map(|c| ChannelRefKind::CanonicalId(c[1].to_string()))
}

fn match_handle(target: &Target<'_>) -> Option<ChannelRefKind> {
    let candidate = target.path.as_deref().unwrap_or(target.raw);
    HANDLE_PATH
        .captures(candidate)
        .map(|c| ChannelRefKind::Handle(c[1].to_string()))
}

fn match_username(target: &Target<'_>) -> Option<ChannelRefKind> {
    let path = target.path.as_deref()?;
    USER_PATH
        .captures(path)
        .map(|c| ChannelRefKind::Username(c[1].to_string()))
}

fn match_vanity(target: &Target<'_>) -> Option<ChannelRefKind> {
    let path = target.path.as_deref()?;
    let captures = VANITY_PATH.captures(path)?;
    let name = &captures[1];
    if RESERVED_PATHS.contains(&name) {
        return None;
    }
    Some(ChannelRefKind::VanityPath(name.to_string()))
}

impl ChannelRef {
    /// Classify a raw reference
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Empty`] for blank input.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let target = Target {
            raw,
            path: url_path(raw),
        };

        let kind = MATCHERS
            .iter()
            .find_map(|(_, matcher)| matcher(&target))
            .unwrap_or_else(|| ChannelRefKind::FreeText(raw.to_string()));

        Ok(Self {
            raw: raw.to_string(),
            kind,
        })
    }

    /// The reference exactly as given (trimmed)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Classification
    pub fn kind(&self) -> &ChannelRefKind {
        &self.kind
    }

    /// Names of the matchers in priority order
    pub fn matcher_order() -> impl Iterator<Item = &'static str> {
        MATCHERS.iter().map(|(name, _)| *name)
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Extract the decoded path of a URL-shaped reference
///
/// Scheme-less inputs such as `youtube.com/@name` are treated as https URLs.
fn url_path(raw: &str) -> Option<String> {
    let url = match Url::parse(raw) {
        Ok(url) if url.has_host() => url,
        Ok(_) => return None,
        Err(_) => {
            let (host, _) = raw.split_once('/')?;
            if !host.contains('.') || host.contains(char::is_whitespace) {
                return None;
            }
            Url::parse(&format!("https://{raw}")).ok()?
        }
    };

    let path = url.path().trim_start_matches('/');
    let decoded = urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string());
    Some(decoded)
}
