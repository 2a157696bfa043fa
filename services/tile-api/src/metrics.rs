//! Prometheus counters and timings for the tile API.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record an incoming request against one of the imagery endpoints.
pub fn record_request(endpoint: &'static str) {
    counter!("imagery_requests_total", "endpoint" => endpoint).increment(1);
}

/// Record a redirect issued for an imprecise timestamp.
pub fn record_redirect() {
    counter!("imagery_redirects_total").increment(1);
}

/// Record the outcome and duration of a render.
pub fn record_render(elapsed: Duration, success: bool) {
    if success {
        counter!("imagery_renders_total").increment(1);
    } else {
        counter!("imagery_render_errors_total").increment(1);
    }
    histogram!("imagery_render_duration_seconds").record(elapsed.as_secs_f64());
}
