//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod retry;

use std::sync::LazyLock;

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

/// Length of the hex prefix used as a notice id.
pub const NOTICE_ID_LEN: usize = 24;

/// Longest evidence file base name.
const MAX_FILENAME_LEN: usize = 180;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^0-9A-Za-z._-]+").unwrap_or_else(|e| panic!("invalid filename pattern: {e}"))
});

/// Hex-encoded SHA-256 of a string.
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Deterministic notice id: hash of the detail URL when present, else of
/// the row text, truncated to [`NOTICE_ID_LEN`] hex characters.
pub fn notice_id(detail_url: Option<&str>, row_text: &str) -> String {
    let source = match detail_url {
        Some(url) if !url.is_empty() => url,
        _ => row_text,
    };
    let mut id = sha256_hex(source);
    id.truncate(NOTICE_ID_LEN);
    id
}

/// Replace runs of characters outside `[0-9A-Za-z._-]` with `_`.
pub fn safe_filename(s: &str) -> String {
    UNSAFE_FILENAME_CHARS
        .replace_all(s, "_")
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect()
}

/// Current UTC time as RFC 3339 with second precision.
pub fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Compact UTC timestamp used in evidence file names.
pub fn utc_now_compact() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

/// Whether an `href` points at a page rather than a script or anchor.
pub fn is_navigable_url(href: Option<&str>) -> bool {
    let Some(href) = href.map(str::trim) else {
        return false;
    };
    if href.is_empty() {
        return false;
    }
    let lower = href.to_lowercase();
    !(lower.starts_with("javascript:") || lower.starts_with('#'))
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Whitespace-free form of a header or key, so `입찰보증서\n접수마감일시`
/// compares equal to `입찰보증서접수마감일시`.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_id_is_deterministic() {
        let a = notice_id(Some("https://example.com/d?id=1"), "row");
        let b = notice_id(Some("https://example.com/d?id=1"), "other row");
        assert_eq!(a, b);
        assert_eq!(a.len(), NOTICE_ID_LEN);
        assert_ne!(a, notice_id(Some("https://example.com/d?id=2"), "row"));
    }

    #[test]
    fn test_notice_id_falls_back_to_row_text() {
        let text = "공고A\t기관A\t2026-01-01";
        let expected = &sha256_hex(text)[..NOTICE_ID_LEN];
        assert_eq!(notice_id(None, text), expected);
        assert_eq!(notice_id(Some(""), text), expected);
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("abc_2026:01 01"), "abc_2026_01_01");
        assert_eq!(safe_filename("공고/1"), "_1");
        assert_eq!(safe_filename(&"a".repeat(300)).len(), 180);
    }

    #[test]
    fn test_is_navigable_url() {
        assert!(is_navigable_url(Some("https://nuri.g2b.go.kr/x")));
        assert!(is_navigable_url(Some("/detail?id=1")));
        assert!(!is_navigable_url(Some("javascript:void(0)")));
        assert!(!is_navigable_url(Some("#")));
        assert!(!is_navigable_url(Some("#top")));
        assert!(!is_navigable_url(Some("  ")));
        assert!(!is_navigable_url(None));
    }

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(" 입찰보증서\n접수마감일시 "), "입찰보증서접수마감일시");
        assert_eq!(normalize_key(""), "");
    }
}
