//! Base file handler
//!
//! Strips the base URI, resolves the rest through the [`RestrictedFs`] and
//! streams the file. Any failure to open maps to the same 404.

use super::listing;
use crate::fs::{FsEntry, OpenFile, RestrictedFs};
use crate::http::cache;
use crate::http::{self, body, RangeOutcome, ResponseBody};
use crate::logger;
use crate::middleware::{Handler, ServeRequest};
use async_trait::async_trait;
use hyper::header::{
    HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, IF_MODIFIED_SINCE,
    IF_NONE_MATCH, LAST_MODIFIED, RANGE,
};
use hyper::{Method, Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::io::SeekFrom;
use std::path::Path;
use tokio::io::AsyncSeekExt;

const INDEX_FILE: &str = "index.html";

pub struct FileHandler {
    fs: RestrictedFs,
    base_uri: String,
}

impl FileHandler {
    pub fn new(fs: RestrictedFs, base_uri: impl Into<String>) -> Self {
        Self {
            fs,
            base_uri: base_uri.into(),
        }
    }

    async fn serve_directory(
        &self,
        request: &ServeRequest,
        relative: &str,
        dir: &Path,
    ) -> Response<ResponseBody> {
        // Relative links in the listing only work from a URL ending in '/'
        let path = request.uri().path();
        if !path.ends_with('/') {
            let target = match request.uri().query() {
                Some(q) => format!("{path}/?{q}"),
                None => format!("{path}/"),
            };
            return http::build_redirect_response(&target);
        }

        let index = format!("{}/{INDEX_FILE}", relative.trim_end_matches('/'));
        if let Ok(FsEntry::File(file)) = self.fs.open(&index).await {
            return serve_file(request, file).await;
        }

        match listing::read_listing(dir).await {
            Ok(items) => http::build_html_response(
                listing::render_listing(&items),
                request.method() == Method::HEAD,
            ),
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to read directory '{}': {e}",
                    dir.display()
                ));
                http::build_404_response()
            }
        }
    }
}

#[async_trait]
impl Handler for FileHandler {
    async fn handle(&self, request: ServeRequest) -> Response<ResponseBody> {
        if request.method() != Method::GET && request.method() != Method::HEAD {
            return http::build_405_response();
        }

        let Ok(decoded) = percent_decode_str(request.uri().path()).decode_utf8() else {
            return http::build_404_response();
        };
        let Some(relative) = strip_base(&decoded, &self.base_uri) else {
            return http::build_404_response();
        };

        match self.fs.open(relative).await {
            Ok(FsEntry::File(file)) => serve_file(&request, file).await,
            Ok(FsEntry::Directory(dir)) => self.serve_directory(&request, relative, &dir).await,
            Err(_) => http::build_404_response(),
        }
    }
}

/// Remove `base` from the front of `path` on a segment boundary.
/// `/static/a.txt` with base `/static` gives `/a.txt`; `/staticfoo` gives `None`.
pub fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

async fn serve_file(request: &ServeRequest, open: OpenFile) -> Response<ResponseBody> {
    let OpenFile {
        mut file,
        metadata,
        path,
    } = open;
    let size = metadata.len();
    let modified = metadata.modified().ok().map(cache::truncate_to_secs);
    let headers = request.headers();

    // If-None-Match takes precedence over If-Modified-Since
    if !headers.contains_key(IF_NONE_MATCH) {
        if let (Some(modified), Some(since)) = (
            modified,
            headers.get(IF_MODIFIED_SINCE).and_then(|v| v.to_str().ok()),
        ) {
            if !cache::is_modified_since(modified, since) {
                let mut response = http::build_304_response();
                insert_last_modified(&mut response, modified);
                return response;
            }
        }
    }

    let range = headers.get(RANGE).and_then(|v| v.to_str().ok());
    let (status, start, len, content_range) = match http::parse_range_header(range, size) {
        RangeOutcome::Full => (StatusCode::OK, 0, size, None),
        RangeOutcome::Partial(r) => (
            StatusCode::PARTIAL_CONTENT,
            r.start,
            r.len(),
            Some(r.content_range(size)),
        ),
        RangeOutcome::NotSatisfiable => return http::build_416_response(size),
    };

    let body = if request.method() == Method::HEAD {
        body::empty()
    } else {
        if start > 0 {
            if let Err(e) = file.seek(SeekFrom::Start(start)).await {
                logger::log_error(&format!("Failed to seek '{}': {e}", path.display()));
                return http::build_500_response();
            }
        }
        body::file(file, len)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type(&path)) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(value) = content_range.and_then(|v| HeaderValue::from_str(&v).ok()) {
        headers.insert(CONTENT_RANGE, value);
    }
    if let Some(modified) = modified {
        insert_last_modified(&mut response, modified);
    }
    response
}

fn insert_last_modified(response: &mut Response<ResponseBody>, modified: std::time::SystemTime) {
    if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
        response.headers_mut().insert(LAST_MODIFIED, value);
    }
}

/// MIME type from the extension; text types are declared UTF-8
fn content_type(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let is_text = mime.type_() == mime_guess::mime::TEXT
        || mime.subtype() == mime_guess::mime::JAVASCRIPT
        || mime.subtype() == mime_guess::mime::JSON;
    if is_text && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    }
}
