//! Early port availability checks
//!
//! Checking before binding is inherently racy; the real bind remains the
//! source of truth. These checks only give faster feedback at startup.

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Check that the HTTP port and the metrics port (if any) can be bound
pub async fn validate_ports_available(config: &ServerConfig) -> Result<()> {
    let mut ports = vec![("HTTP", config.http_port)];
    if let Some(port) = config.metrics_port {
        if port == config.http_port {
            return Err(ServerError::Ports(format!(
                "metrics port {} collides with the HTTP port",
                port
            )));
        }
        ports.push(("metrics", port));
    }

    for (role, port) in ports {
        validate_port_range(port)?;
        validate_single_port(&config.host, port, role).await?;
    }

    info!("Server ports validated");
    Ok(())
}

async fn validate_single_port(host: &str, port: u16, role: &'static str) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    debug!(role, port, "Checking port");

    match TcpListener::bind(&addr).await {
        Ok(listener) => {
            drop(listener);
            Ok(())
        }
        Err(e) => {
            error!(role, port, error = %e, "Port is not available");
            Err(ServerError::PortUnavailable {
                role,
                port,
                reason: e.to_string(),
            })
        }
    }
}

pub async fn is_port_in_use(host: &str, port: u16) -> bool {
    TcpListener::bind(format!("{}:{}", host, port)).await.is_err()
}

/// Reject port 0 and warn on privileged ports
pub fn validate_port_range(port: u16) -> Result<()> {
    if port == 0 {
        return Err(ServerError::Ports(
            "port 0 cannot be used for an explicit bind".to_string(),
        ));
    }
    if port < 1024 {
        warn!("Port {} is a privileged port", port);
    }
    Ok(())
}
