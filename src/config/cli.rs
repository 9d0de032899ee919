// Command-line flags
// Single-dash flags in the style `-p 8100`, `-p=8100`, `-e`, `-e=false`, `-mp 9090`

use clap::Parser;
use std::ffi::OsString;

/// Flags left unset stay `None` so the environment and defaults can fill them in
#[derive(Debug, Default, Clone, Parser)]
#[command(name = "serve", version, about = "Serve a directory tree over HTTP")]
pub struct Cli {
    /// Port to serve on [env: PORT] [default: 8100]
    #[arg(short = 'p', value_name = "PORT")]
    pub port: Option<u16>,

    /// Directory of static files to host [env: DIRECTORY] [default: .]
    #[arg(short = 'd', value_name = "DIR")]
    pub directory: Option<String>,

    /// Base path of static files on the web [env: BASE_URI] [default: /]
    #[arg(short = 'b', value_name = "PATH")]
    pub base_uri: Option<String>,

    /// Keep-Alive response header value [env: KEEPALIVE]
    #[arg(short = 'k', value_name = "VALUE")]
    pub keep_alive: Option<String>,

    /// Cache-Control response header value [env: CACHECONTROL]
    #[arg(short = 'c', value_name = "VALUE")]
    pub cache_control: Option<String>,

    /// Calculate and add an ETag from the response body [env: ETAG]
    #[arg(short = 'e', num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub etag: Option<bool>,

    /// Show directory listings [env: DIRINDEX]
    #[arg(short = 'i', num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub dir_index: Option<bool>,

    /// Log every request [env: LOG]
    #[arg(short = 'l', num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub log: Option<bool>,

    /// Collect metrics and serve them on the metrics port [env: METRICS]
    #[arg(short = 'm', num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub metrics: Option<bool>,

    /// Port the metrics endpoint listens on [env: METRICS_PORT] [default: 9090]
    #[arg(long = "mp", value_name = "PORT")]
    pub metrics_port: Option<u16>,
}

impl Cli {
    /// Parse process arguments, accepting `-mp` as a long flag
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Rewrite the two-letter `-mp` flag into `--mp`, which clap can parse.
/// Everything after a bare `--` is left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let rewritten = match arg.to_str() {
                Some("--") => {
                    passthrough = true;
                    None
                }
                Some(s) if s == "-mp" || s.starts_with("-mp=") => Some(OsString::from(format!("-{s}"))),
                _ => None,
            };
            rewritten.unwrap_or(arg)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_flags_leaves_everything_unset() {
        let cli = parse(&["serve"]);
        assert!(cli.port.is_none());
        assert!(cli.directory.is_none());
        assert!(cli.etag.is_none());
        assert!(cli.metrics_port.is_none());
    }

    #[test]
    fn test_value_flags() {
        let cli = parse(&["serve", "-p", "3000", "-d=/srv/www", "-b", "/static", "-k", "300"]);
        assert_eq!(cli.port, Some(3000));
        assert_eq!(cli.directory.as_deref(), Some("/srv/www"));
        assert_eq!(cli.base_uri.as_deref(), Some("/static"));
        assert_eq!(cli.keep_alive.as_deref(), Some("300"));
    }

    #[test]
    fn test_bool_flags() {
        let cli = parse(&["serve", "-e", "-i=true", "-l=false"]);
        assert_eq!(cli.etag, Some(true));
        assert_eq!(cli.dir_index, Some(true));
        assert_eq!(cli.log, Some(false));
        assert_eq!(cli.metrics, None);
    }

    #[test]
    fn test_metrics_port_flag() {
        assert_eq!(parse(&["serve", "-m", "-mp", "9191"]).metrics_port, Some(9191));
        assert_eq!(parse(&["serve", "-mp=9292"]).metrics_port, Some(9292));
    }

    #[test]
    fn test_normalize_stops_at_double_dash() {
        let args = normalize_args(["serve", "-mp", "1", "--", "-mp"]);
        assert_eq!(args, vec!["serve", "--mp", "1", "--", "-mp"]);
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(Cli::try_parse_from(["serve", "-p", "http"]).is_err());
    }
}
