//! Client configuration.
//!
//! A [`ClientConfig`] is built once with chainable setters and validated
//! once by [`Client::new`](crate::client::Client::new). No I/O happens at
//! construction beyond checking that configured TLS files exist.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default gNMI port.
pub const DEFAULT_PORT: u16 = 57400;
/// Default maximum retry count.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default minimum backoff delay.
pub const DEFAULT_BACKOFF_MIN_DELAY: Duration = Duration::from_secs(1);
/// Default maximum backoff delay.
pub const DEFAULT_BACKOFF_MAX_DELAY: Duration = Duration::from_secs(60);
/// Default backoff growth factor.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
/// Default timeout for establishing the physical connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default per-operation timeout.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for a [`Client`](crate::client::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Target host, optionally with an explicit `host:port`.
    pub target: String,
    /// Port appended when the target has none.
    pub port: u16,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Path to the TLS client certificate.
    pub tls_cert: Option<PathBuf>,
    /// Path to the TLS client key.
    pub tls_key: Option<PathBuf>,
    /// Path to the TLS CA bundle.
    pub tls_ca: Option<PathBuf>,
    /// Whether to use TLS. Disabling it sends credentials in clear text.
    pub use_tls: bool,
    /// Whether to verify the server certificate.
    pub verify_certificate: bool,
    /// Timeout for establishing the physical connection.
    pub connect_timeout: Duration,
    /// Default per-operation timeout, overridable per call.
    pub operation_timeout: Duration,
    /// Maximum number of retries for transient failures.
    pub max_retries: u32,
    /// Minimum backoff delay.
    pub backoff_min_delay: Duration,
    /// Maximum backoff delay.
    pub backoff_max_delay: Duration,
    /// Backoff growth factor. Must be >= 1.0.
    pub backoff_factor: f64,
    /// Pretty-print JSON payloads in debug logs.
    pub pretty_print_logs: bool,
}

impl ClientConfig {
    /// Create a configuration for `target` with default values.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            tls_cert: None,
            tls_key: None,
            tls_ca: None,
            use_tls: true,
            verify_certificate: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_min_delay: DEFAULT_BACKOFF_MIN_DELAY,
            backoff_max_delay: DEFAULT_BACKOFF_MAX_DELAY,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            pretty_print_logs: true,
        }
    }

    /// Set the port appended when the target has none.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the TLS client certificate path.
    #[must_use]
    pub fn tls_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_cert = Some(path.into());
        self
    }

    /// Set the TLS client key path.
    #[must_use]
    pub fn tls_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_key = Some(path.into());
        self
    }

    /// Set the TLS CA bundle path.
    #[must_use]
    pub fn tls_ca(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls_ca = Some(path.into());
        self
    }

    /// Enable or disable TLS.
    #[must_use]
    pub fn use_tls(mut self, enabled: bool) -> Self {
        self.use_tls = enabled;
        self
    }

    /// Enable or disable server certificate verification.
    #[must_use]
    pub fn verify_certificate(mut self, verify: bool) -> Self {
        self.verify_certificate = verify;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the default per-operation timeout.
    #[must_use]
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the maximum retry count.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the minimum backoff delay.
    #[must_use]
    pub fn backoff_min_delay(mut self, delay: Duration) -> Self {
        self.backoff_min_delay = delay;
        self
    }

    /// Set the maximum backoff delay.
    #[must_use]
    pub fn backoff_max_delay(mut self, delay: Duration) -> Self {
        self.backoff_max_delay = delay;
        self
    }

    /// Set the backoff growth factor.
    #[must_use]
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Enable or disable pretty-printed JSON in debug logs.
    #[must_use]
    pub fn pretty_print_logs(mut self, enabled: bool) -> Self {
        self.pretty_print_logs = enabled;
        self
    }

    /// Whether any credential material is configured, without exposing it.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some() || self.tls_cert.is_some()
    }

    /// Target address with the default port appended when absent.
    #[must_use]
    pub fn address(&self) -> String {
        if self.target.contains(':') {
            self.target.clone()
        } else {
            format!("{}:{}", self.target, self.port)
        }
    }

    /// Validate the configuration.
    ///
    /// Insecure TLS settings and missing credentials produce warnings, not
    /// errors; a device may legitimately run without them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.trim().is_empty() {
            return Err(ConfigError::EmptyTarget);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(0));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::NonPositiveTimeout { which: "connect" });
        }
        if self.operation_timeout.is_zero() {
            return Err(ConfigError::NonPositiveTimeout { which: "operation" });
        }
        if self.backoff_min_delay.is_zero() {
            return Err(ConfigError::NonPositiveBackoffMin);
        }
        if self.backoff_max_delay <= self.backoff_min_delay {
            return Err(ConfigError::InvertedBackoffBounds {
                min: self.backoff_min_delay,
                max: self.backoff_max_delay,
            });
        }
        if self.backoff_factor < 1.0 {
            return Err(ConfigError::BackoffFactorTooSmall(self.backoff_factor));
        }

        if self.use_tls && !self.verify_certificate {
            warn!(
                target = %self.target,
                "TLS certificate verification disabled, connection is vulnerable to interception"
            );
        }
        if !self.use_tls {
            warn!(
                target = %self.target,
                "TLS disabled, credentials and data are transmitted in clear text"
            );
        }

        check_tls_file(self.tls_cert.as_deref(), "certificate")?;
        check_tls_file(self.tls_key.as_deref(), "key")?;
        check_tls_file(self.tls_ca.as_deref(), "CA")?;

        if !self.has_credentials() {
            warn!(
                target = %self.target,
                "no credentials configured, device may reject the connection"
            );
        }

        Ok(())
    }
}

/// Check a configured TLS file exists. The full path goes to the debug log
/// only; the error carries the base file name to avoid disclosing
/// filesystem layout.
fn check_tls_file(path: Option<&Path>, kind: &'static str) -> Result<(), ConfigError> {
    let Some(path) = path else {
        return Ok(());
    };
    if let Err(err) = std::fs::metadata(path) {
        debug!(path = %path.display(), error = %err, "TLS {kind} file validation failed");
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(ConfigError::TlsFileMissing { kind, file });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("10.0.0.1");
        assert_eq!(config.port, 57400);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_min_delay, Duration::from_secs(1));
        assert_eq!(config.backoff_max_delay, Duration::from_secs(60));
        assert_eq!(config.backoff_factor, 2.0);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.operation_timeout, Duration::from_secs(15));
        assert!(config.use_tls);
        assert!(config.verify_certificate);
        assert!(config.pretty_print_logs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address_appends_default_port() {
        assert_eq!(ClientConfig::new("router1").address(), "router1:57400");
        assert_eq!(
            ClientConfig::new("router1").port(6030).address(),
            "router1:6030"
        );
        assert_eq!(ClientConfig::new("router1:9339").address(), "router1:9339");
    }

    #[test]
    fn test_empty_target_rejected() {
        let err = ClientConfig::new("  ").validate().unwrap_err();
        assert_eq!(err, ConfigError::EmptyTarget);
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = ClientConfig::new("r1").port(0).validate().unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort(0));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let err = ClientConfig::new("r1")
            .connect_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveTimeout { which: "connect" });

        let err = ClientConfig::new("r1")
            .operation_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveTimeout { which: "operation" });
    }

    #[test]
    fn test_inverted_backoff_bounds_rejected() {
        let err = ClientConfig::new("r1")
            .backoff_min_delay(Duration::from_secs(10))
            .backoff_max_delay(Duration::from_secs(5))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedBackoffBounds { .. }));
    }

    #[test]
    fn test_small_backoff_factor_rejected() {
        let err = ClientConfig::new("r1")
            .backoff_factor(0.5)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::BackoffFactorTooSmall(0.5));
    }

    #[test]
    fn test_missing_tls_file_uses_base_name() {
        let err = ClientConfig::new("r1")
            .tls_cert("/very/secret/layout/device-cert.pem")
            .validate()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("device-cert.pem"));
        assert!(!message.contains("/very/secret"));
    }

    #[test]
    fn test_has_credentials() {
        assert!(!ClientConfig::new("r1").has_credentials());
        assert!(ClientConfig::new("r1").username("admin").has_credentials());
        assert!(ClientConfig::new("r1").password("pw").has_credentials());
    }
}
