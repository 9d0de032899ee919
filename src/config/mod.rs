// Configuration module entry point
// Resolves flags, environment variables and defaults into a ServerConfig

mod cli;
mod types;

use std::collections::HashMap;

pub use cli::{normalize_args, Cli};
pub use types::ServerConfig;

use types::RawConfig;

/// Environment variables consulted during resolution
pub const ENV_KEYS: [&str; 10] = [
    "PORT",
    "DIRECTORY",
    "BASE_URI",
    "KEEPALIVE",
    "CACHECONTROL",
    "ETAG",
    "DIRINDEX",
    "LOG",
    "METRICS",
    "METRICS_PORT",
];

/// Snapshot of the process environment restricted to `ENV_KEYS`
pub fn env_snapshot() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| ENV_KEYS.contains(&key.as_str()))
        .collect()
}

impl ServerConfig {
    /// Resolve the configuration from the process arguments and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::resolve(&Cli::parse_args(), env_snapshot())
    }

    /// Resolve with flag > environment > default precedence.
    /// Empty environment values count as unset.
    pub fn resolve(cli: &Cli, env: HashMap<String, String>) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("port", 8100)?
            .set_default("directory", ".")?
            .set_default("base_uri", "/")?
            .set_default("keepalive", "")?
            .set_default("cachecontrol", "")?
            .set_default("etag", false)?
            .set_default("dirindex", false)?
            .set_default("log", false)?
            .set_default("metrics", false)?
            .set_default("metrics_port", 9090)?
            .add_source(
                config::Environment::default()
                    .ignore_empty(true)
                    .source(Some(env)),
            )
            .set_override_option("port", cli.port.map(i64::from))?
            .set_override_option("directory", cli.directory.clone())?
            .set_override_option("base_uri", cli.base_uri.clone())?
            .set_override_option("keepalive", cli.keep_alive.clone())?
            .set_override_option("cachecontrol", cli.cache_control.clone())?
            .set_override_option("etag", cli.etag)?
            .set_override_option("dirindex", cli.dir_index)?
            .set_override_option("log", cli.log)?
            .set_override_option("metrics", cli.metrics)?
            .set_override_option("metrics_port", cli.metrics_port.map(i64::from))?
            .build()?;

        let raw: RawConfig = settings.try_deserialize()?;
        Ok(raw.into())
    }
}
