//! HTTP cache validation module
//!
//! Provides body fingerprinting (`ETag`) and conditional request checks.

use sha1::{Digest, Sha1};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Streaming SHA-1 accumulator over a response body
#[derive(Clone, Default)]
pub struct Fingerprinter {
    hasher: Sha1,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Quoted lowercase hex digest, e.g. `"da39a3ee5e6b4b0d3255bfef95601890afd80709"`
    pub fn finish(self) -> String {
        format!("\"{}\"", hex::encode(self.hasher.finalize()))
    }
}

/// Fingerprint a complete body in one call
pub fn fingerprint(content: &[u8]) -> String {
    let mut fp = Fingerprinter::new();
    fp.update(content);
    fp.finish()
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Wildcard: `*`
/// - Weak validators: `W/"abc123"` matches `"abc123"`
///
/// Returns true if matched (should return 304), false otherwise
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let etag = strip_weak(etag);
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || strip_weak(candidate) == etag
        })
    })
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// True when the resource changed after the `If-Modified-Since` date.
/// Dates compare at whole-second precision; an unparsable header counts as modified.
pub fn is_modified_since(modified: SystemTime, if_modified_since: &str) -> bool {
    let Ok(since) = httpdate::parse_http_date(if_modified_since) else {
        return true;
    };
    truncate_to_secs(modified) > since
}

/// HTTP dates carry no sub-second part
pub fn truncate_to_secs(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map_or(time, |d| UNIX_EPOCH + Duration::from_secs(d.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_quoted_sha1() {
        assert_eq!(
            fingerprint(b"hello world"),
            "\"2aae6c35c94fcfb415dbe95f408b9ce91ee846ed\""
        );
    }

    #[test]
    fn test_empty_body_fingerprint() {
        assert_eq!(
            fingerprint(b""),
            "\"da39a3ee5e6b4b0d3255bfef95601890afd80709\""
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let mut fp = Fingerprinter::new();
        fp.update(b"hello ");
        fp.update(b"world");
        assert_eq!(fp.finish(), fingerprint(b"hello world"));
    }

    #[test]
    fn test_fingerprint_difference() {
        assert_ne!(fingerprint(b"content a"), fingerprint(b"content b"));
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "\"abc123\"";
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("W/\"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(Some(""), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_is_modified_since() {
        let modified = UNIX_EPOCH + Duration::from_millis(784_111_777_500);
        // Sun, 06 Nov 1994 08:49:37 GMT == 784111777
        assert!(!is_modified_since(modified, "Sun, 06 Nov 1994 08:49:37 GMT"));
        assert!(is_modified_since(modified, "Sun, 06 Nov 1994 08:49:36 GMT"));
        assert!(is_modified_since(modified, "not a date"));
    }
}
