//! Metrics instrumentation for session observability.

use std::time::Instant;
use wolf_protocol::Request;

/// Record how long a player callback ran.
pub fn record_callback_latency(request: Request, duration_ms: f64) {
    metrics::histogram!("player_callback_latency", duration_ms, "request" => request.to_string());
}

/// Increment the callback timeout counter.
pub fn increment_callback_timeouts(request: Request) {
    metrics::counter!("player_callback_timeouts", 1, "request" => request.to_string());
}

/// Increment the counter of packets replaced by a request-only fallback.
pub fn increment_schema_fallbacks() {
    metrics::counter!("schema_fallbacks", 1);
}

pub fn increment_packets_processed(request: Request) {
    metrics::counter!("packets_processed", 1, "request" => request.to_string());
}

/// RAII timer that records callback latency on drop.
pub struct CallbackTimer {
    start: Instant,
    request: Request,
}

impl CallbackTimer {
    pub fn new(request: Request) -> Self {
        Self {
            start: Instant::now(),
            request,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Drop for CallbackTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        record_callback_latency(self.request, duration_ms);
    }
}
