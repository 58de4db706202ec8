//! Startup settings.
//!
//! Loading flow:
//! 1. Start with [`Settings::default()`]
//! 2. Apply environment variable overrides ([`Settings::apply_env`])
//! 3. The binary applies CLI flags on top
//!
//! The resulting value is built once and handed to every component; nothing
//! reads the environment after startup.

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;
use tracing::debug;

use crate::errors::ConfigError;

/// Host and port a listener binds to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerAddr {
    pub host: String,
    pub port: u16,
}

impl ListenerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ListenerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Environment variable names.
pub mod env_vars {
    pub const PUBLIC_URL: &str = "TRACELINK_PUBLIC_URL";
    pub const OPERATOR_USER: &str = "TRACELINK_OPERATOR_USER";
    pub const OPERATOR_PASS: &str = "TRACELINK_OPERATOR_PASS";
    pub const CAPTURE_HOST: &str = "TRACELINK_CAPTURE_HOST";
    pub const CAPTURE_PORT: &str = "TRACELINK_CAPTURE_PORT";
    pub const OPERATOR_HOST: &str = "TRACELINK_OPERATOR_HOST";
    pub const OPERATOR_PORT: &str = "TRACELINK_OPERATOR_PORT";
    pub const DATA_DIR: &str = "TRACELINK_DATA_DIR";
}

#[derive(Clone, Debug)]
pub struct Settings {
    /// Public, unauthenticated listener.
    pub capture: ListenerAddr,
    /// Authenticated listener, loopback by convention.
    pub operator: ListenerAddr,
    /// External base URL used in generated links. Never ends with `/`.
    pub public_base_url: Option<String>,
    pub operator_username: String,
    /// `None` means a password is generated at startup.
    pub operator_password: Option<SecretString>,
    /// Root for the event database, rendered codes and static assets.
    pub data_dir: PathBuf,
    /// Upper bound on a `/report` body.
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capture: ListenerAddr::new("127.0.0.1", 5000),
            operator: ListenerAddr::new("127.0.0.1", 5001),
            public_base_url: None,
            operator_username: "admin".into(),
            operator_password: None,
            data_dir: PathBuf::from("."),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Settings {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    }

    /// Apply overrides from `lookup`. Unparseable or out-of-range values are
    /// ignored and the current value stands.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read_string = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let read_port = |key: &str| {
            let raw = read_string(key)?;
            match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    debug!(key, value = %raw, "ignoring invalid port override");
                    None
                }
            }
        };

        if let Some(v) = read_string(env_vars::PUBLIC_URL) {
            self.set_public_base_url(&v);
        }
        if let Some(v) = read_string(env_vars::OPERATOR_USER) {
            self.operator_username = v;
        }
        // Passwords are taken verbatim; surrounding whitespace is significant.
        if let Some(v) = lookup(env_vars::OPERATOR_PASS).filter(|v| !v.is_empty()) {
            self.operator_password = Some(SecretString::from(v));
        }
        if let Some(v) = read_string(env_vars::CAPTURE_HOST) {
            self.capture.host = v;
        }
        if let Some(v) = read_port(env_vars::CAPTURE_PORT) {
            self.capture.port = v;
        }
        if let Some(v) = read_string(env_vars::OPERATOR_HOST) {
            self.operator.host = v;
        }
        if let Some(v) = read_port(env_vars::OPERATOR_PORT) {
            self.operator.port = v;
        }
        if let Some(v) = read_string(env_vars::DATA_DIR) {
            self.data_dir = PathBuf::from(v);
        }
    }

    /// Set the external base URL; blank input clears it.
    pub fn set_public_base_url(&mut self, raw: &str) {
        let trimmed = raw.trim().trim_end_matches('/');
        self.public_base_url = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    /// Check invariants the listeners rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operator_username.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        if self.capture == self.operator && self.capture.port != 0 {
            return Err(ConfigError::ListenerConflict(self.capture.to_string()));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_body_bytes",
                detail: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Base URL used when neither an override nor a public URL is set.
    pub fn fallback_base_url(&self) -> String {
        format!("http://{}", self.capture)
    }

    pub fn events_db_path(&self) -> PathBuf {
        self.data_dir.join("logs").join("events.db")
    }

    pub fn codes_dir(&self) -> PathBuf {
        self.data_dir.join("qrcodes")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.data_dir.join("static").join("img")
    }
}
