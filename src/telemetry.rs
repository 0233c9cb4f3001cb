//! Telemetry utilities for verdict timing and span naming.

use std::time::Instant;

/// Guard for timing one verdict and recording it.
///
/// Records the elapsed time when dropped, whichever way the check ends.
pub struct CheckTimer {
    start: Instant,
}

impl CheckTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Drop for CheckTimer {
    fn drop(&mut self) {
        crate::metrics::record_check_duration(self.start.elapsed().as_secs_f64());
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for one supervised econ connection.
    pub fn server(addr: &str) -> Span {
        info_span!("server", server = %addr)
    }

    /// Span for one join-triggered check.
    pub fn check(client_id: u32, ip: &str) -> Span {
        info_span!("check", client_id, ip = %ip)
    }
}
