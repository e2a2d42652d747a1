//! Wall-clock reporting for pipeline stages.

use std::time::Instant;

/// Run `f` and log how long the `stage` took.
pub fn report_time<T>(stage: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(stage, elapsed_ms, "Stage finished");
    out
}
