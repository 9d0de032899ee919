//! Logger module
//!
//! Provides logging utilities for the server:
//! - Server lifecycle logging
//! - Request records
//! - Error and warning logging
//!
//! Info lines go to stdout, errors and warnings to stderr. A failed write is
//! dropped; logging never fails the caller.

mod format;

pub use format::{format_line, format_request};

use crate::config::ServerConfig;
use chrono::Local;
use hyper::{Method, Uri};
use std::io::{self, Write};
use std::net::SocketAddr;

/// Write to info log
fn write_info(message: &str) {
    let line = format_line(&Local::now(), message);
    let _ = writeln!(io::stdout().lock(), "{line}");
}

/// Write to error log
fn write_error(message: &str) {
    let line = format_line(&Local::now(), message);
    let _ = writeln!(io::stderr().lock(), "{line}");
}

pub fn log_server_start(addr: &SocketAddr, config: &ServerConfig) {
    write_info(&format!(
        "Serving {} directory with {} basepath on HTTP port: {}",
        config.directory.display(),
        config.base_uri,
        addr.port()
    ));
    write_info(&format!(
        "ETag: {}, directory index: {}, request log: {}, metrics: {}",
        on_off(config.etag_enabled),
        on_off(config.dir_index_enabled),
        on_off(config.log_enabled),
        on_off(config.metrics_enabled),
    ));
}

pub fn log_metrics_start(addr: &SocketAddr) {
    write_info(&format!("serving metrics at: :{}", addr.port()));
}

pub fn log_request(method: &Method, uri: &Uri) {
    write_info(&format_request(method, uri));
}

pub fn log_shutdown() {
    write_info("Shutdown signal received, no longer accepting connections");
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_transport_error(err: &impl std::fmt::Display) {
    write_error(&format!("[ERROR] unable to write HTTP response: {err}"));
}

pub fn log_bind_failed(err: &impl std::fmt::Display) {
    log_error(&err.to_string());
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
