//! Parsing of RFC 8288 style `Link` headers used for cursor pagination.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static LINK_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<([^>]+)>;\s*rel="([^"]+)""#).expect("link segment pattern is valid")
});

/// Errors produced while parsing a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkHeaderError {
    #[error("malformed link header segment: {0:?}")]
    Malformed(String),
}

/// Parse a `Link` header into a map of relation name to URL.
///
/// A leading `link:` token is tolerated. Every comma-separated segment must
/// carry a `<url>; rel="name"` pair; anything else is rejected rather than
/// guessed at.
pub fn parse_link_header(header: &str) -> Result<HashMap<String, String>, LinkHeaderError> {
    let trimmed = header.trim_start();
    let header = trimmed.strip_prefix("link:").unwrap_or(trimmed);

    let mut links = HashMap::new();

    for segment in header.split(',') {
        if segment.trim().is_empty() {
            continue;
        }

        let captures = LINK_SEGMENT
            .captures(segment)
            .ok_or_else(|| LinkHeaderError::Malformed(segment.trim().to_owned()))?;

        links.insert(captures[2].to_owned(), captures[1].to_owned());
    }

    Ok(links)
}

/// Convenience accessor for the `next` relation.
pub fn next_link(header: &str) -> Result<Option<String>, LinkHeaderError> {
    Ok(parse_link_header(header)?.remove("next"))
}
