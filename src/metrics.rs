use std::time::Instant;
use tracing::trace;

// Counters and timings go out as trace events under `crosslist.metrics`; no
// metrics recorder macros are used.

pub fn inc_requests(route: &'static str) {
    trace!(target = "crosslist.metrics", route, "requests_total_inc");
}

/// Wall-clock timer around one outbound call.
pub struct UpstreamTimer {
    upstream: &'static str,
    started: Instant,
}

impl UpstreamTimer {
    pub fn start(upstream: &'static str) -> Self {
        Self {
            upstream,
            started: Instant::now(),
        }
    }

    /// Emits the elapsed time with the call's outcome and returns it in ms.
    pub fn finish(self, ok: bool) -> u64 {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        trace!(
            target = "crosslist.metrics",
            upstream = self.upstream,
            elapsed_ms,
            ok,
            "upstream_elapsed"
        );
        elapsed_ms
    }
}
