//! Input sanitizers for untrusted request data and operator-supplied settings.
//!
//! Everything read from a request (headers, URI, method, forwarded IPs) passes through
//! [`sanitize_text_field`] or [`sanitize_url`] before it is placed in a visit report.
//! The access token entered through the settings surface goes through
//! [`sanitize_access_token`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum stored length of an access token.
pub const MAX_ACCESS_TOKEN_LEN: usize = 255;

/// URL schemes accepted by [`sanitize_url`] when the input is in absolute form.
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https"];

static SCRIPT_STYLE_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*?>.*?</(script|style)>").expect("valid regex")
});

static HTML_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

static PERCENT_OCTETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)%[a-f0-9]{2}").expect("valid regex"));

static ENCODED_LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)%0[ad]").expect("valid regex"));

static TOKEN_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("valid regex"));

/// Remove backslash escaping from untrusted input.
///
/// `\x` becomes `x` and `\\` becomes `\`; a trailing lone backslash is dropped.
pub fn unslash(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Sanitize a single-line text value taken from a request.
///
/// Steps: unslash, drop `<script>`/`<style>` blocks and all markup, escape any
/// remaining `<`, fold control characters and whitespace runs into a single space,
/// strip percent-encoded octets and trim.
pub fn sanitize_text_field(input: &str) -> String {
    let mut value = unslash(input);

    if value.contains('<') {
        value = SCRIPT_STYLE_BLOCKS.replace_all(&value, "").into_owned();
        value = HTML_TAGS.replace_all(&value, "").into_owned();
        value = value.replace('<', "&lt;");
    }

    let value: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let mut value = collapse_whitespace(&value);

    let mut found = false;
    while PERCENT_OCTETS.is_match(&value) {
        value = PERCENT_OCTETS.replace_all(&value, "").into_owned();
        found = true;
    }
    if found {
        value = collapse_whitespace(&value);
    }

    value
}

fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RUNS.replace_all(value, " ").trim().to_string()
}

/// Sanitize a raw request URI (origin-form path or absolute-form URL).
///
/// Characters outside the URL-safe set are removed, encoded CR/LF sequences are
/// stripped, and absolute URLs with a scheme other than http(s) yield an empty string.
pub fn sanitize_url(input: &str) -> String {
    let trimmed = unslash(input);
    let trimmed = trimmed.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut url: String = trimmed
        .replace(' ', "%20")
        .chars()
        .filter(|c| is_url_char(*c))
        .collect();

    while ENCODED_LINE_BREAKS.is_match(&url) {
        url = ENCODED_LINE_BREAKS.replace_all(&url, "").into_owned();
    }
    url = url.replace(";//", "://");

    if let Some(scheme) = url_scheme(&url) {
        let allowed = ALLOWED_URL_SCHEMES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme));
        if !allowed {
            return String::new();
        }
    }

    url
}

fn is_url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || !c.is_ascii() || "-~+_.?#=!&;,/:%@$|*'()[]".contains(c)
}

/// Return the scheme of `url` if the part before the first `:` looks like one.
fn url_scheme(url: &str) -> Option<&str> {
    let (candidate, _) = url.split_once(':')?;
    if candidate.is_empty() || candidate.contains(['/', '?', '#']) {
        return None;
    }
    let mut chars = candidate.chars();
    let first_is_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_valid = chars.all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c));
    (first_is_alpha && rest_valid).then_some(candidate)
}

/// Normalize an access token submitted through the settings surface.
///
/// Whitespace is trimmed, every character outside `[A-Za-z0-9_-]` is removed and the
/// result is truncated to [`MAX_ACCESS_TOKEN_LEN`] characters.
pub fn sanitize_access_token(input: &str) -> String {
    let stripped = TOKEN_DISALLOWED.replace_all(input.trim(), "");
    // Only ASCII survives the filter, so byte truncation is char-safe.
    let mut token = stripped.into_owned();
    token.truncate(MAX_ACCESS_TOKEN_LEN);
    token
}

/// Whether `token` already satisfies the stored-token invariant.
pub fn is_valid_access_token(token: &str) -> bool {
    token.len() <= MAX_ACCESS_TOKEN_LEN && !TOKEN_DISALLOWED.is_match(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unslash() {
        assert_eq!(unslash(r"O\'Reilly"), "O'Reilly");
        assert_eq!(unslash(r"a\\b"), r"a\b");
        assert_eq!(unslash("trailing\\"), "trailing");
    }

    #[test]
    fn test_text_field_strips_control_and_whitespace() {
        assert_eq!(sanitize_text_field("  TestBot/1.0 \r\n"), "TestBot/1.0");
        assert_eq!(sanitize_text_field("a\t\tb\u{0}c"), "a b c");
    }

    #[test]
    fn test_text_field_strips_markup() {
        assert_eq!(
            sanitize_text_field("Mozilla<script>alert(1)</script>/5.0"),
            "Mozilla/5.0"
        );
        assert_eq!(sanitize_text_field("<b>bold</b> text"), "bold text");
        assert_eq!(sanitize_text_field("a < b"), "a &lt; b");
    }

    #[test]
    fn test_text_field_strips_percent_octets() {
        assert_eq!(sanitize_text_field("hello%20world"), "helloworld");
        assert_eq!(sanitize_text_field("%%4141"), "");
        assert_eq!(sanitize_text_field("%2%41"), "%2");
    }

    #[test]
    fn test_sanitize_url_keeps_paths() {
        assert_eq!(sanitize_url("/blog/post-1"), "/blog/post-1");
        assert_eq!(sanitize_url("/search?q=rust&page=2"), "/search?q=rust&page=2");
        assert_eq!(sanitize_url("/a b"), "/a%20b");
    }

    #[test]
    fn test_sanitize_url_removes_unsafe() {
        assert_eq!(sanitize_url("/x\"<y>"), "/xy");
        assert_eq!(sanitize_url("/x%0d%0aSet-Cookie:a"), "/xSet-Cookie:a");
        assert_eq!(sanitize_url("javascript:alert(1)"), "");
        assert_eq!(sanitize_url("https://example.com/p"), "https://example.com/p");
        assert_eq!(sanitize_url("   "), "");
    }

    #[test]
    fn test_sanitize_access_token() {
        assert_eq!(sanitize_access_token("ab c!@#"), "abc");
        assert_eq!(sanitize_access_token("  tok_123-ABC  "), "tok_123-ABC");
        assert_eq!(sanitize_access_token(&"x".repeat(300)).len(), 255);
        assert_eq!(sanitize_access_token("élan"), "lan");
    }

    #[test]
    fn test_is_valid_access_token() {
        assert!(is_valid_access_token(""));
        assert!(is_valid_access_token("tok123"));
        assert!(!is_valid_access_token("tok 123"));
        assert!(!is_valid_access_token(&"a".repeat(256)));
    }
}
