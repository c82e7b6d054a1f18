//! Dispatch lateness monitoring for the scheduler thread.
//!
//! Every dispatched batch or event records how far behind its deadline it
//! fired. Samples go into a fixed ring buffer so recording never allocates.

use std::time::Duration;

/// Ring buffer size for lateness samples.
const SAMPLE_BUFFER_SIZE: usize = 256;

/// Lateness statistics for one reporting window, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySummary {
    pub avg_late_us: u32,
    pub max_late_us: u32,
    pub p95_late_us: u32,
    /// Dispatches later than the budget, cumulative over the session.
    pub overruns: u64,
}

pub struct DispatchTelemetry {
    late_us: [u32; SAMPLE_BUFFER_SIZE],
    idx: usize,
    /// Samples held, saturating at the buffer size.
    len: usize,
    window_max_us: u32,
    overruns: u64,
    budget_us: u32,
}

impl DispatchTelemetry {
    /// `budget` is the lateness above which a dispatch counts as an overrun.
    pub fn new(budget: Duration) -> Self {
        Self {
            late_us: [0; SAMPLE_BUFFER_SIZE],
            idx: 0,
            len: 0,
            window_max_us: 0,
            overruns: 0,
            budget_us: to_us(budget),
        }
    }

    #[inline]
    pub fn record(&mut self, lateness: Duration) {
        let us = to_us(lateness);
        self.late_us[self.idx] = us;
        self.idx = (self.idx + 1) % SAMPLE_BUFFER_SIZE;
        self.len = (self.len + 1).min(SAMPLE_BUFFER_SIZE);
        self.window_max_us = self.window_max_us.max(us);
        if us > self.budget_us {
            self.overruns += 1;
        }
    }

    /// Record lateness given in seconds; early dispatches count as zero.
    pub fn record_secs(&mut self, lateness: f64) {
        let secs = if lateness.is_finite() { lateness.max(0.0) } else { 0.0 };
        self.record(Duration::from_secs_f64(secs));
    }

    pub fn sample_count(&self) -> usize {
        self.len
    }

    /// Summarize the buffered samples and start a new max window.
    pub fn take_summary(&mut self) -> TelemetrySummary {
        if self.len == 0 {
            return TelemetrySummary {
                overruns: self.overruns,
                ..TelemetrySummary::default()
            };
        }

        let samples = &self.late_us[..self.len];
        let sum: u64 = samples.iter().map(|&x| x as u64).sum();
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let p95_idx = ((self.len * 95 / 100).max(1) - 1).min(self.len - 1);

        let summary = TelemetrySummary {
            avg_late_us: (sum / self.len as u64) as u32,
            max_late_us: self.window_max_us,
            p95_late_us: sorted[p95_idx],
            overruns: self.overruns,
        };
        self.window_max_us = 0;
        summary
    }
}

fn to_us(d: Duration) -> u32 {
    d.as_micros().min(u32::MAX as u128) as u32
}
