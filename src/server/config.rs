use crate::capture::{CaptureConfig, DEFAULT_MAX_HEAD_SIZE, ONE_GIB};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the capture server
///
/// # Examples
///
/// ```
/// use capturesrv::server::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1:3000".parse().unwrap())
///     .with_max_body_size(None)
///     .with_max_connections(50);
///
/// assert!(config.max_body_size.is_none());
/// assert_eq!(config.max_connections, 50);
/// ```
///
/// Using the default configuration:
///
/// ```
/// use capturesrv::capture::ONE_GIB;
/// use capturesrv::server::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.max_body_size, Some(ONE_GIB));
/// assert!(config.read_timeout.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Capture ceiling for request bodies (`None` for unbounded)
    pub max_body_size: Option<u64>,
    /// Maximum size of a request line plus headers
    pub max_head_size: usize,
    /// Read timeout per request (None for no timeout)
    pub read_timeout: Option<Duration>,
    /// Write timeout per response (None for no timeout)
    pub write_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Create a new configuration with the given address
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Set the capture ceiling
    pub fn with_max_body_size(mut self, max_body_size: Option<u64>) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Set the request head limit
    pub fn with_max_head_size(mut self, max_head_size: usize) -> Self {
        self.max_head_size = max_head_size;
        self
    }

    /// Set the connection limit
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_connections: 1000,
            max_body_size: Some(ONE_GIB),
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl From<&ServerConfig> for CaptureConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_head_size: config.max_head_size,
            max_body_size: config.max_body_size,
        }
    }
}
