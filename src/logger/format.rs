//! Log line formatting
//!
//! Every line carries a local timestamp prefix, e.g. `2024/05/01 12:00:00 [Request] GET /a.txt`.

use chrono::{DateTime, Local};
use hyper::{Method, Uri};

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Prefix `message` with the given timestamp
pub fn format_line(time: &DateTime<Local>, message: &str) -> String {
    format!("{} {message}", time.format(TIMESTAMP_FORMAT))
}

/// Request record: method plus path and query exactly as received
pub fn format_request(method: &Method, uri: &Uri) -> String {
    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("[Request] {method} {target}")
}
