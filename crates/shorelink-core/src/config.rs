//! Endpoint configuration.
//!
//! A relay endpoint needs an exchange scope identifier and the remote
//! peer's address. Everything except the scope has a usable default; a
//! missing scope is fatal at construction.

use serde::{Deserialize, Serialize};

/// Environment variable names.
pub mod env_vars {
    pub const SCOPE: &str = "SHORELINK_SCOPE";
    pub const REMOTE_HOST: &str = "SHORELINK_REMOTE_HOST";
    pub const REMOTE_PORT: &str = "SHORELINK_REMOTE_PORT";
    pub const BIND_PORT: &str = "SHORELINK_BIND_PORT";
    pub const QUEUE_CAPACITY: &str = "SHORELINK_QUEUE_CAPACITY";
    pub const TRANSMIT_POLL_MS: &str = "SHORELINK_TRANSMIT_POLL_MS";
}

/// Default configuration values.
pub mod defaults {
    pub const REMOTE_HOST: &str = "localhost";
    pub const REMOTE_PORT: u16 = 5777;
    pub const BIND_PORT: u16 = 5776;
    pub const QUEUE_CAPACITY: usize = 1024;
    pub const TRANSMIT_POLL_MS: u64 = 100;
}

/// Relay endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Exchange scope identifier, used as the origin of endpoint events.
    /// Required; an endpoint will not start without one.
    pub scope: String,
    /// Remote peer host the transport client connects to
    pub remote_host: String,
    /// Remote peer port the transport client connects to
    pub remote_port: u16,
    /// Local port the transport server listens on
    pub bind_port: u16,
    /// Maximum number of commands held in the outbound queue
    pub queue_capacity: usize,
    /// Transmit loop poll interval in milliseconds
    pub transmit_poll_ms: u64,
}

impl RelayConfig {
    /// Create a configuration with the given scope and default addresses.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            remote_host: defaults::REMOTE_HOST.to_string(),
            remote_port: defaults::REMOTE_PORT,
            bind_port: defaults::BIND_PORT,
            queue_capacity: defaults::QUEUE_CAPACITY,
            transmit_poll_ms: defaults::TRANSMIT_POLL_MS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Host, ports and capacity fall back to defaults; the scope does not.
    pub fn from_env() -> Result<Self, ConfigError> {
        let scope = std::env::var(env_vars::SCOPE)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingScope)?;

        let mut config = Self::new(scope);
        if let Ok(host) = std::env::var(env_vars::REMOTE_HOST) {
            config.remote_host = host;
        }
        config.remote_port = parse_env(env_vars::REMOTE_PORT, defaults::REMOTE_PORT)?;
        config.bind_port = parse_env(env_vars::BIND_PORT, defaults::BIND_PORT)?;
        config.queue_capacity = parse_env(env_vars::QUEUE_CAPACITY, defaults::QUEUE_CAPACITY)?;
        config.transmit_poll_ms = parse_env(env_vars::TRANSMIT_POLL_MS, defaults::TRANSMIT_POLL_MS)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the remote peer address.
    pub fn with_remote(mut self, host: impl Into<String>, port: u16) -> Self {
        self.remote_host = host.into();
        self.remote_port = port;
        self
    }

    /// Set the local server port.
    pub fn with_bind_port(mut self, port: u16) -> Self {
        self.bind_port = port;
        self
    }

    /// Set the outbound queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the transmit loop poll interval.
    pub fn with_transmit_poll_ms(mut self, interval_ms: u64) -> Self {
        self.transmit_poll_ms = interval_ms;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scope.trim().is_empty() {
            return Err(ConfigError::MissingScope);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: env_vars::QUEUE_CAPACITY,
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required scope identifier")]
    MissingScope,

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}
