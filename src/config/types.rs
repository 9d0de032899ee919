// Configuration types module
// The resolved, immutable server configuration and its raw deserialized form

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Server configuration, resolved once at startup and never mutated afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Root of the served directory tree
    pub directory: PathBuf,
    /// URL prefix stripped before file lookup, always starts with `/`
    pub base_uri: String,
    /// `Keep-Alive` header value
    pub keep_alive: Option<String>,
    /// `Cache-Control` header value, used verbatim
    pub cache_control: Option<String>,
    pub etag_enabled: bool,
    pub dir_index_enabled: bool,
    pub log_enabled: bool,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl ServerConfig {
    /// Main listener address, all interfaces
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Metrics listener address, all interfaces
    pub fn metrics_socket_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.metrics_port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8100,
            directory: PathBuf::from("."),
            base_uri: "/".to_string(),
            keep_alive: None,
            cache_control: None,
            etag_enabled: false,
            dir_index_enabled: false,
            log_enabled: false,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// Flat key space shared by defaults, environment variables and flags.
/// Keys are the lowercased environment variable names.
#[derive(Debug, Deserialize)]
pub(super) struct RawConfig {
    pub port: u16,
    pub directory: String,
    pub base_uri: String,
    pub keepalive: String,
    pub cachecontrol: String,
    pub etag: bool,
    pub dirindex: bool,
    pub log: bool,
    pub metrics: bool,
    pub metrics_port: u16,
}

impl From<RawConfig> for ServerConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            port: raw.port,
            directory: PathBuf::from(raw.directory),
            base_uri: normalize_base_uri(&raw.base_uri),
            keep_alive: non_empty(raw.keepalive),
            cache_control: non_empty(raw.cachecontrol),
            etag_enabled: raw.etag,
            dir_index_enabled: raw.dirindex,
            log_enabled: raw.log,
            metrics_enabled: raw.metrics,
            metrics_port: raw.metrics_port,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn normalize_base_uri(base: &str) -> String {
    let base = base.trim();
    if base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{base}")
    }
}
