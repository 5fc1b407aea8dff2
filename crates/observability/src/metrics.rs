//! Prometheus metrics for round computations
//!
//! # Metrics
//!
//! * `qf_rounds_computed_total` - Rounds computed successfully
//! * `qf_round_failures_total{kind}` - Failed rounds by error kind
//! * `qf_round_duration_seconds` - Wall time of one round, fetches included
//! * `qf_discarded_contributions_total` - Contributions with no approved project
//! * `qf_unresolved_prices_total` - Tokens whose USD price could not be resolved

use metrics::{counter, histogram, Counter, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Start the Prometheus exporter, serving `/metrics` on `port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Handles to the round metrics.
///
/// Without an installed recorder every call is a no-op, so this is safe to
/// use in tests and in `qfx compute`.
#[derive(Clone)]
pub struct RoundMetrics {
    rounds_computed: Counter,
    round_duration: Histogram,
    discarded_contributions: Counter,
    unresolved_prices: Counter,
}

impl RoundMetrics {
    pub fn new() -> Self {
        Self {
            rounds_computed: counter!("qf_rounds_computed_total"),
            round_duration: histogram!("qf_round_duration_seconds"),
            discarded_contributions: counter!("qf_discarded_contributions_total"),
            unresolved_prices: counter!("qf_unresolved_prices_total"),
        }
    }

    pub fn round_computed(&self, duration: Duration, discarded: u64, unresolved_tokens: u64) {
        self.rounds_computed.increment(1);
        self.round_duration.record(duration.as_secs_f64());
        self.discarded_contributions.increment(discarded);
        self.unresolved_prices.increment(unresolved_tokens);
    }

    /// `kind` is a short stable label such as `round_not_found` or `timeout`
    pub fn round_failed(&self, kind: &'static str, duration: Duration) {
        counter!("qf_round_failures_total", "kind" => kind).increment(1);
        self.round_duration.record(duration.as_secs_f64());
    }

    /// Start timing a round
    pub fn start(&self) -> RoundTimer {
        RoundTimer {
            start: Instant::now(),
        }
    }
}

impl Default for RoundMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Elapsed-time helper for one round
pub struct RoundTimer {
    start: Instant,
}

impl RoundTimer {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_recorder_are_noops() {
        let metrics = RoundMetrics::new();
        let timer = metrics.start();
        metrics.round_computed(timer.elapsed(), 3, 1);
        metrics.round_failed("timeout", timer.elapsed());
    }
}
