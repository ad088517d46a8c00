//! Input cleanup applied to every user message before it is matched,
//! stored or forwarded to the completion service.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ValidationError;

/// Hard cap on raw message length, counted in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

static RE_SQL_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|TRUNCATE|EXEC|UNION|FROM|WHERE)\b")
        .unwrap()
});
static RE_STATEMENT_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--|;|/\*|\*/|@@|@").unwrap());
static RE_TAUTOLOGY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(OR|AND)\b\s+\d+\s*=\s*\d+").unwrap());
static RE_QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"['"\\]"#).unwrap());

/// Entity-escape the characters that matter to an HTML renderer.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            '`' => escaped.push_str("&#x60;"),
            '=' => escaped.push_str("&#x3D;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Remove tokens that look like SQL or script injection, then trim.
pub fn strip_injection(input: &str) -> String {
    let mut stripped = input.to_string();
    for pattern in [&RE_SQL_KEYWORDS, &RE_STATEMENT_MARKERS, &RE_TAUTOLOGY, &RE_QUOTES] {
        stripped = pattern.replace_all(&stripped, "").into_owned();
    }
    stripped.trim().to_string()
}

/// Full cleanup: strip injection tokens first, then escape what is left.
pub fn sanitize(input: &str) -> String {
    escape_html(&strip_injection(input))
}

/// Checks the raw input, before sanitizing, so the length limit reflects
/// what the user actually typed.
pub fn validate_message(input: &str) -> Result<(), ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = input.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ValidationError::TooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(())
}

pub fn is_valid_message(input: &str) -> bool {
    validate_message(input).is_ok()
}
