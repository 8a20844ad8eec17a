//! Client configuration.
//!
//! Settings resolve in three layers, later layers winning:
//!
//! 1. built-in defaults,
//! 2. a TOML configuration file ([`Config::load`] searches `$TESSERA_CONFIG`,
//!    `./tessera.toml`, then `~/.tessera/config.toml`),
//! 3. environment variables (`TESSERA_HOST`, `TESSERA_KEY_ID`,
//!    `TESSERA_SECRET_KEY`, `TESSERA_TIMEOUT_MS`, `TESSERA_RETRIES`,
//!    `TESSERA_RETRY_INTERVAL_MS`, `TESSERA_UPLOAD_BATCH_SIZE`).
//!
//! A configuration file only needs the keys it wants to override:
//!
//! ```toml
//! host = "api.tessera.io:443"
//! key_id = "IY3487E2J6ZHFOW5A7P5"
//! secret_key = "..."
//! timeout_ms = 10000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TesseraError};

/// Default API host and port.
pub const DEFAULT_HOST: &str = "api.tessera.io:443";
/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default number of attempts per request.
pub const DEFAULT_RETRIES: u32 = 3;
/// Default sleep between attempts in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 5_000;
/// Default number of features per upload chunk.
pub const DEFAULT_UPLOAD_BATCH_SIZE: usize = 1000;

/// Connection and credential settings for a [`Client`](crate::Client).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// API host as `host:port`. Port 443 selects HTTPS, anything else HTTP.
    pub host: String,
    /// API key identifier, sent in the `Authorization` header.
    pub key_id: String,
    /// Secret key used to sign requests. Never sent over the wire.
    pub secret_key: String,
    /// Per-request timeout in milliseconds. Doubles after each timed-out
    /// attempt within a single call.
    pub timeout_ms: u64,
    /// Total attempts per request, including the first one.
    pub retries: u32,
    /// Sleep between attempts in milliseconds.
    pub retry_interval_ms: u64,
    /// Maximum number of features per create call; larger batches are split.
    pub upload_batch_size: usize,
    /// Key id of another account whose resources are shared with this one.
    pub sharing_key_id: Option<String>,
    /// Sharing key granting access to that account's resources.
    pub sharing_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            key_id: String::new(),
            secret_key: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            upload_batch_size: DEFAULT_UPLOAD_BATCH_SIZE,
            sharing_key_id: None,
            sharing_key: None,
        }
    }
}

impl Config {
    /// Create a configuration with the given credentials and defaults for
    /// everything else.
    pub fn new(
        host: impl Into<String>,
        key_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            key_id: key_id.into(),
            secret_key: secret_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from defaults, the first configuration file found,
    /// and the environment, in that order.
    pub fn load() -> Result<Self> {
        let config = match find_config_file() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        Ok(config.overlay_env())
    }

    /// Load configuration from a specific TOML file. Missing keys keep their
    /// defaults; unknown keys are an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| TesseraError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Build configuration from defaults and environment variables only.
    pub fn from_env() -> Self {
        Self::default().overlay_env()
    }

    fn overlay_env(mut self) -> Self {
        if let Ok(host) = std::env::var("TESSERA_HOST") {
            self.host = host;
        }
        if let Ok(key_id) = std::env::var("TESSERA_KEY_ID") {
            self.key_id = key_id;
        }
        if let Ok(secret_key) = std::env::var("TESSERA_SECRET_KEY") {
            self.secret_key = secret_key;
        }
        self.timeout_ms = env_parsed("TESSERA_TIMEOUT_MS").unwrap_or(self.timeout_ms);
        self.retries = env_parsed("TESSERA_RETRIES").unwrap_or(self.retries);
        self.retry_interval_ms =
            env_parsed("TESSERA_RETRY_INTERVAL_MS").unwrap_or(self.retry_interval_ms);
        self.upload_batch_size =
            env_parsed("TESSERA_UPLOAD_BATCH_SIZE").unwrap_or(self.upload_batch_size);
        self
    }

    /// Set the per-request timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the total number of attempts per request.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the sleep between attempts in milliseconds.
    pub fn with_retry_interval_ms(mut self, retry_interval_ms: u64) -> Self {
        self.retry_interval_ms = retry_interval_ms;
        self
    }

    /// Set the number of features per upload chunk.
    pub fn with_upload_batch_size(mut self, upload_batch_size: usize) -> Self {
        self.upload_batch_size = upload_batch_size;
        self
    }

    /// Grant access to another account's shared resources on every request.
    pub fn with_sharing_keys(
        mut self,
        sharing_key_id: impl Into<String>,
        sharing_key: impl Into<String>,
    ) -> Self {
        self.sharing_key_id = Some(sharing_key_id.into());
        self.sharing_key = Some(sharing_key.into());
        self
    }

    /// Scheme and host for requests: `https://` when the port is 443,
    /// `http://` otherwise.
    pub fn base_url(&self) -> String {
        if self.host.ends_with(":443") {
            format!("https://{}", self.host)
        } else {
            format!("http://{}", self.host)
        }
    }

    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Sleep between attempts as a [`Duration`].
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Search order: `$TESSERA_CONFIG`, `./tessera.toml`, `~/.tessera/config.toml`.
fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TESSERA_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from("tessera.toml");
    if local.exists() {
        return Some(local);
    }
    let home = dirs::home_dir()?.join(".tessera").join("config.toml");
    if home.exists() {
        return Some(home);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.host, "api.tessera.io:443");
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.retries, 3);
        assert_eq!(config.retry_interval_ms, 5_000);
        assert_eq!(config.upload_batch_size, 1000);
        assert!(config.sharing_key_id.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::new("geo.example.com:8080", "key", "secret")
            .with_timeout_ms(500)
            .with_retries(5)
            .with_retry_interval_ms(100)
            .with_upload_batch_size(10);
        assert_eq!(config.host, "geo.example.com:8080");
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.retries, 5);
        assert_eq!(config.retry_interval_ms, 100);
        assert_eq!(config.upload_batch_size, 10);
    }

    #[test]
    fn test_base_url_scheme_follows_port() {
        let https = Config::new("api.tessera.io:443", "k", "s");
        assert_eq!(https.base_url(), "https://api.tessera.io:443");

        let http = Config::new("localhost:8000", "k", "s");
        assert_eq!(http.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "host = \"geo.example.com:443\"\nkey_id = \"abc\"\ntimeout_ms = 2500"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.host, "geo.example.com:443");
        assert_eq!(config.key_id, "abc");
        assert_eq!(config.timeout_ms, 2500);
        // Unset keys keep their defaults.
        assert_eq!(config.retries, DEFAULT_RETRIES);
        assert!(config.secret_key.is_empty());
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"x:443\"\nhttp_timeout = 3").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_sharing_keys() {
        let config = Config::default().with_sharing_keys("other_key_id", "other_sharing_key");
        assert_eq!(config.sharing_key_id.as_deref(), Some("other_key_id"));
        assert_eq!(config.sharing_key.as_deref(), Some("other_sharing_key"));
    }
}
