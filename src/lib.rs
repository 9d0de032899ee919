pub mod config;
pub mod error;
pub mod fs;
pub mod handler;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod middleware;
pub mod server;
