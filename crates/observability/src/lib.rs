//! Observability for the QF matching service
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics for round computations
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("qfx", LogFormat::Pretty)?;
//!
//! // Optional exporter
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, RoundMetrics, RoundTimer};
