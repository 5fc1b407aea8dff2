//! HTTP server infrastructure for the QF matching service
//!
//! Wraps an axum [`Router`](axum::Router) with lifecycle management and
//! graceful shutdown.
//!
//! # Architecture
//!
//! [`HttpServer`] implements the [`Server`] trait.
//!
//! Shutdown coordination uses `CancellationToken` from `tokio_util`; a
//! cancelled parent token cancels every child token.
//!
//! # Quick Start
//!
//! ```ignore
//! use server::{HttpServer, Server, ServerConfig, ShutdownController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let shutdown = ShutdownController::with_signals();
//!     let config = ServerConfig::new("0.0.0.0", 8080);
//!     HttpServer::new(config, router).run(shutdown.token()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`] - Bind address configuration
//! - [`traits`] - The `Server` lifecycle trait
//! - [`http`] - HTTP server using Axum
//! - [`health`] - Liveness endpoint
//! - [`shutdown`] - Graceful shutdown utilities
//! - [`port_validator`] - Early port availability checks

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod port_validator;
pub mod shutdown;
pub mod traits;

pub use config::{ports, ServerConfig};
pub use error::{Result, ServerError};
pub use health::{health_handler, HealthState, HealthStatus};
pub use http::HttpServer;
pub use port_validator::validate_ports_available;
pub use shutdown::{shutdown_signal, ShutdownController};
pub use traits::Server;
