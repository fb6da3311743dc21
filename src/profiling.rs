use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Set to any non-empty value to log a timing summary after each sync.
pub const PROFILE_ENV: &str = "MCPSYNC_PROFILE";

/// A simple timer for measuring execution time of code blocks
#[derive(Debug)]
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    /// Create a new timer with a label
    pub fn new(label: &str) -> Self {
        debug!("Starting timer: {}", label);
        Self { label: label.to_string(), start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and log the elapsed time
    pub fn stop(self) -> Duration {
        let elapsed = self.start.elapsed();
        debug!("Timer '{}' completed in {:?}", self.label, elapsed);
        elapsed
    }
}

/// Macro for timing a block of code
#[macro_export]
macro_rules! time_block {
    ($label:expr, $block:block) => {{
        let _timer = $crate::profiling::Timer::new($label);
        let result = $block;
        result
    }};
}

/// Whether timing summaries were requested through the environment.
pub fn profiling_enabled() -> bool {
    std::env::var(PROFILE_ENV).is_ok_and(|v| !v.trim().is_empty())
}

/// Per-target timing for one apply.
#[derive(Debug, Clone)]
pub struct TargetMetric {
    pub tool_id: String,
    pub duration: Duration,
    pub success: bool,
}

/// Timing collected over an `apply_all` run.
#[derive(Debug, Clone, Default)]
pub struct SyncMetrics {
    pub succeeded: usize,
    pub failed: usize,
    pub targets: Vec<TargetMetric>,
    pub total_duration: Duration,
}

impl SyncMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tool_id: &str, duration: Duration, success: bool) {
        self.targets.push(TargetMetric { tool_id: tool_id.to_string(), duration, success });
        if success {
            self.succeeded = self.succeeded.saturating_add(1);
        } else {
            self.failed = self.failed.saturating_add(1);
        }
    }

    /// Sum of per-target durations; larger than `total_duration` when targets ran in parallel.
    pub fn busy_time(&self) -> Duration {
        self.targets.iter().map(|t| t.duration).sum()
    }

    pub fn log_summary(&self) {
        if !profiling_enabled() {
            debug!(
                "Synced {} targets ({} failed) in {:?}",
                self.targets.len(),
                self.failed,
                self.total_duration
            );
            return;
        }

        info!("=== Sync Performance Summary ===");
        info!("Targets processed: {}", self.targets.len());
        info!("Succeeded: {}", self.succeeded);
        info!("Failed: {}", self.failed);
        info!("Total time: {:?} (busy {:?})", self.total_duration, self.busy_time());

        let mut sorted = self.targets.iter().collect::<Vec<_>>();
        sorted.sort_by_key(|t| std::cmp::Reverse(t.duration));

        info!("Slowest targets:");
        for (i, target) in sorted.iter().take(5).enumerate() {
            info!(
                "  {}. {} - {:?} ({})",
                i.saturating_add(1),
                target.tool_id,
                target.duration,
                if target.success { "success" } else { "failed" }
            );
        }
    }
}
