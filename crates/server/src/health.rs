//! Liveness endpoint

use axum::{extract::State, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub uptime_seconds: u64,
}

/// Shared state for the health handler, wrapped in `Arc` by the router
#[derive(Debug, Clone)]
pub struct HealthState {
    pub service_name: String,
    pub version: String,
    pub start_time: Instant,
}

impl HealthState {
    pub fn new(service_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            version: version.into(),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            service: self.service_name.clone(),
            version: self.version.clone(),
            timestamp: Utc::now().to_rfc3339(),
            uptime_seconds: self.uptime_seconds(),
        }
    }
}

pub async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<HealthStatus> {
    Json(state.status())
}

/// Stateless variant
pub async fn simple_health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
