//! Configuration for dispatchkv
//!
//! Centralized configuration with sensible defaults.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::{KvError, Result};

/// Listen address used when none is configured
pub const DEFAULT_LISTEN_ADDR: &str = ":3333";

/// Main configuration for a dispatchkv server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address. A bare `:port` binds every interface.
    pub listen_addr: String,

    /// Size of the per-connection socket read buffer (bytes)
    pub read_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Largest incomplete frame a peer will buffer before giving up on it (bytes)
    pub max_frame_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            read_buffer_size: 4 * 1024,
            max_frame_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolve `listen_addr` to a bindable socket address
    ///
    /// An empty address falls back to the default, and `:3333` is
    /// read as `0.0.0.0:3333`.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = if self.listen_addr.is_empty() {
            DEFAULT_LISTEN_ADDR
        } else {
            self.listen_addr.as_str()
        };

        let addr = match addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{}", port),
            None => addr.to_string(),
        };

        addr.to_socket_addrs()
            .map_err(|e| KvError::Config(format!("invalid listen address {:?}: {}", addr, e)))?
            .next()
            .ok_or_else(|| KvError::Config(format!("listen address {:?} did not resolve", addr)))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the per-connection read buffer size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size.max(1);
        self
    }

    /// Set the maximum buffered frame size (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the maximum buffered frame size in KiB, saturating on overflow
    pub fn max_frame_kb(self, kb: usize) -> Self {
        self.max_frame_size(kb.saturating_mul(1024))
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Configuration for [`Client`](crate::client::Client)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address (host:port)
    pub server_addr: String,

    /// Upper bound on the single read that collects a GET reply (bytes)
    pub reply_buffer_size: usize,

    /// How long a GET waits for a reply before treating the key as absent
    pub read_timeout: Duration,
}

impl ClientConfig {
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            reply_buffer_size: 1024,
            read_timeout: Duration::from_millis(500),
        }
    }

    pub fn reply_buffer_size(mut self, size: usize) -> Self {
        self.reply_buffer_size = size.max(1);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listens_on_3333() {
        let config = Config::default();
        assert_eq!(config.listen_addr, ":3333");

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 3333);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn empty_address_falls_back_to_default() {
        let config = Config::builder().listen_addr("").build();
        assert_eq!(config.socket_addr().unwrap().port(), 3333);
    }

    #[test]
    fn explicit_address_is_kept() {
        let config = Config::builder().listen_addr("127.0.0.1:7000").build();
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn garbage_address_is_a_config_error() {
        let config = Config::builder().listen_addr("not an address").build();
        assert!(matches!(config.socket_addr(), Err(KvError::Config(_))));
    }

    #[test]
    fn max_frame_kb_saturates() {
        assert_eq!(Config::builder().max_frame_kb(16).build().max_frame_size, 16 * 1024);
        assert_eq!(Config::builder().max_frame_kb(usize::MAX).build().max_frame_size, usize::MAX);
    }

    #[test]
    fn builder_sets_fields() {
        let config = Config::builder()
            .read_buffer_size(0)
            .max_frame_size(64)
            .build();
        assert_eq!(config.read_buffer_size, 1);
        assert_eq!(config.max_frame_size, 64);
    }
}
