//! Server configuration.
//!
//! All values come from environment variables with development-friendly
//! defaults. Production deployments must set real credentials.

use std::time::Duration;

/// Server process configuration.
///
/// # Examples
///
/// ```ignore
/// let config = ServerConfig::from_env();
/// assert!(!config.listen.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g. `"0.0.0.0:9000"`).
    pub listen: String,
    /// Path prefix the S3 surface is mounted at (`""` for the root).
    pub prefix: String,
    /// Access key clients sign with.
    pub access_key: String,
    /// Secret key matching `access_key`.
    pub secret_key: String,
    /// Skip SigV2 verification (development only).
    pub skip_signatures: bool,
    /// Allowed clock skew for request dates.
    pub clock_skew: Duration,
    /// How long to wait for a client to send its request headers.
    pub header_read_timeout: Duration,
    /// Log level filter string (e.g. `"info"`, `"debug"`).
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: String::from("0.0.0.0:9000"),
            prefix: String::new(),
            access_key: String::from("cumulus"),
            secret_key: String::from("cumulus-secret"),
            skip_signatures: false,
            clock_skew: Duration::from_secs(15 * 60),
            header_read_timeout: Duration::from_secs(30),
            log_level: String::from("info"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `CUMULUS_LISTEN` | `0.0.0.0:9000` |
    /// | `CUMULUS_PREFIX` | *(empty)* |
    /// | `CUMULUS_ACCESS_KEY` | `cumulus` |
    /// | `CUMULUS_SECRET_KEY` | `cumulus-secret` |
    /// | `CUMULUS_SKIP_SIGNATURES` | `false` |
    /// | `CUMULUS_CLOCK_SKEW_SECS` | `900` |
    /// | `CUMULUS_HEADER_TIMEOUT_SECS` | `30` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("CUMULUS_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("CUMULUS_PREFIX") {
            config.prefix = v;
        }
        if let Ok(v) = std::env::var("CUMULUS_ACCESS_KEY") {
            config.access_key = v;
        }
        if let Ok(v) = std::env::var("CUMULUS_SECRET_KEY") {
            config.secret_key = v;
        }
        if let Ok(v) = std::env::var("CUMULUS_SKIP_SIGNATURES") {
            config.skip_signatures = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("CUMULUS_CLOCK_SKEW_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                config.clock_skew = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("CUMULUS_HEADER_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                config.header_read_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
