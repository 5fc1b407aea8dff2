//! Server error types

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Startup check found a listen port taken
    #[error("{role} port {port} is unavailable: {reason}")]
    PortUnavailable {
        role: &'static str,
        port: u16,
        reason: String,
    },

    #[error("Cannot bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Port layout rejected before any bind (port 0, HTTP and metrics sharing a port)
    #[error("Invalid port configuration: {0}")]
    Ports(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    /// The accept loop failed after the listener was up
    #[error("HTTP server stopped: {0}")]
    Serve(#[source] io::Error),
}
