//! Prometheus metrics collection for vpnsentry.
//!
//! Exposed on `GET /metrics` when `[metrics].port` is non-zero.
//!
//! - `vpnsentry_verdicts_total{source}` - verdicts by where they came from
//! - `vpnsentry_provider_requests_total{provider,result}` - provider outcomes
//! - `vpnsentry_check_duration_seconds` - end-to-end verdict latency
//! - `vpnsentry_bans_issued_total` - ban commands written to consoles
//! - `vpnsentry_joins_total` - join events seen on all consoles
//! - `vpnsentry_connected_servers` - consoles currently authenticated
//!
//! Recording is a no-op until [`init`] has run.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Verdicts by source (cache, offline, whitelist, online, degraded).
pub static VERDICTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Provider lookups by provider and result (vpn, clean, rate_limited, unavailable, timeout).
pub static PROVIDER_REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Ban commands sent.
pub static BANS_ISSUED: OnceLock<IntCounter> = OnceLock::new();

/// Player joins observed.
pub static JOINS: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges and histograms
// ========================================================================

/// Authenticated econ connections.
pub static CONNECTED_SERVERS: OnceLock<IntGauge> = OnceLock::new();

/// Time from join to verdict.
pub static CHECK_DURATION: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(VERDICTS, IntCounterVec::new(Opts::new("vpnsentry_verdicts_total", "Verdicts by source"), &["source"]));
    register!(PROVIDER_REQUESTS, IntCounterVec::new(Opts::new("vpnsentry_provider_requests_total", "Reputation lookups by provider and result"), &["provider", "result"]));
    register!(BANS_ISSUED, IntCounter::new("vpnsentry_bans_issued_total", "Ban commands sent to consoles"));
    register!(JOINS, IntCounter::new("vpnsentry_joins_total", "Player joins observed"));
    register!(CONNECTED_SERVERS, IntGauge::new("vpnsentry_connected_servers", "Authenticated econ connections"));
    register!(CHECK_DURATION, Histogram::with_opts(
        HistogramOpts::new("vpnsentry_check_duration_seconds", "Join-to-verdict latency")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

#[inline]
pub fn record_verdict(source: &str) {
    if let Some(c) = VERDICTS.get() {
        c.with_label_values(&[source]).inc();
    }
}

#[inline]
pub fn record_provider(provider: &str, result: &str) {
    if let Some(c) = PROVIDER_REQUESTS.get() {
        c.with_label_values(&[provider, result]).inc();
    }
}

#[inline]
pub fn record_check_duration(secs: f64) {
    if let Some(h) = CHECK_DURATION.get() {
        h.observe(secs);
    }
}

#[inline]
pub fn record_ban() {
    if let Some(c) = BANS_ISSUED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_join() {
    if let Some(c) = JOINS.get() {
        c.inc();
    }
}

#[inline]
pub fn server_connected() {
    if let Some(g) = CONNECTED_SERVERS.get() {
        g.inc();
    }
}

#[inline]
pub fn server_disconnected() {
    if let Some(g) = CONNECTED_SERVERS.get() {
        g.dec();
    }
}
