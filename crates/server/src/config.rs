//! Server bind configuration

use crate::error::{Result, ServerError};
use std::net::SocketAddr;

/// Default port assignments
pub mod ports {
    /// Funding overview API
    pub const HTTP: u16 = 8080;
    /// Prometheus exporter
    pub const METRICS: u16 = 9090;
}

/// Where the HTTP server binds, and which other ports the process claims
///
/// # Example
///
/// ```
/// use server::config::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1", 8080).with_metrics_port(9090);
/// assert_eq!(config.http_port, 8080);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub http_port: u16,
    /// Exporter port, checked for availability alongside the HTTP port
    pub metrics_port: Option<u16>,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, http_port: u16) -> Self {
        Self {
            host: host.into(),
            http_port,
            metrics_port: None,
        }
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.http_port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", ports::HTTP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_addr() {
        let config = ServerConfig::new("127.0.0.1", 8080);
        assert_eq!(config.http_addr().unwrap().port(), 8080);
        assert!(config.metrics_port.is_none());
    }

    #[test]
    fn test_invalid_host() {
        let config = ServerConfig::new("not a host", 8080);
        assert!(matches!(config.http_addr(), Err(ServerError::InvalidAddress(_))));
    }

    #[test]
    fn test_default() {
        let config = ServerConfig::default().with_metrics_port(ports::METRICS);
        assert_eq!(config.http_port, ports::HTTP);
        assert_eq!(config.metrics_port, Some(ports::METRICS));
    }
}
