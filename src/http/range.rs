//! HTTP Range request parsing module
//!
//! Single byte-range support (RFC 7233). Multi-range requests are answered with
//! the full body.

/// Inclusive byte range resolved against a known file size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value
    pub fn content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{total_size}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No Range header, or one we ignore (other unit, multi-range, malformed)
    Full,
    Partial(ByteRange),
    /// Should be answered with 416
    NotSatisfiable,
}

/// Parse a `Range` header against a file of `file_size` bytes
///
/// Supported forms: `bytes=start-end`, `bytes=start-`, `bytes=-suffix`
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeOutcome {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        return parse_suffix(end_str, file_size);
    }

    let Ok(start) = start_str.parse::<u64>() else {
        return RangeOutcome::Full;
    };
    let end = if end_str.is_empty() {
        None
    } else {
        match end_str.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            Ok(_) => return RangeOutcome::Full,
            Err(_) => return RangeOutcome::Full,
        }
    };

    if start >= file_size {
        return RangeOutcome::NotSatisfiable;
    }
    let last = file_size - 1;
    RangeOutcome::Partial(ByteRange {
        start,
        end: end.map_or(last, |e| e.min(last)),
    })
}

/// Last `n` bytes of the file
fn parse_suffix(suffix_str: &str, file_size: u64) -> RangeOutcome {
    let Ok(suffix) = suffix_str.parse::<u64>() else {
        return RangeOutcome::Full;
    };
    if suffix == 0 || file_size == 0 {
        return RangeOutcome::NotSatisfiable;
    }
    RangeOutcome::Partial(ByteRange {
        start: file_size.saturating_sub(suffix),
        end: file_size - 1,
    })
}
