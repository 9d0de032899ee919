//! HTTP response building module
//!
//! Builders for the fixed-shape responses the server emits.

use super::body::{self, ResponseBody};
use hyper::header::{HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION};
use hyper::{Response, StatusCode};

const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Build 404 Not Found response
///
/// The body is the same for every cause so missing files, hidden directories
/// and traversal attempts look identical.
pub fn build_404_response() -> Response<ResponseBody> {
    text_response(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed\n");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<ResponseBody> {
    let mut response = text_response(
        StatusCode::RANGE_NOT_SATISFIABLE,
        "416 range not satisfiable\n",
    );
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{file_size}")) {
        response.headers_mut().insert(CONTENT_RANGE, value);
    }
    response
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<ResponseBody> {
    text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error\n")
}

/// Build 301 redirect to `target`
pub fn build_redirect_response(target: &str) -> Response<ResponseBody> {
    let mut response = Response::new(body::empty());
    *response.status_mut() = StatusCode::MOVED_PERMANENTLY;
    match HeaderValue::from_str(target) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
        }
        Err(e) => {
            crate::logger::log_error(&format!("Failed to build 301 response: {e}"));
            return build_500_response();
        }
    }
    response
}

/// Build 304 Not Modified response without a body
pub fn build_304_response() -> Response<ResponseBody> {
    let mut response = Response::new(body::empty());
    *response.status_mut() = StatusCode::NOT_MODIFIED;
    response
}

/// Build 200 HTML response, the body is dropped for HEAD
pub fn build_html_response(content: String, is_head: bool) -> Response<ResponseBody> {
    let content_length = content.len();
    let body = if is_head {
        body::empty()
    } else {
        body::full(content)
    };
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    response
}

fn text_response(status: StatusCode, message: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(body::full(message));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(message.len()));
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    response
}
