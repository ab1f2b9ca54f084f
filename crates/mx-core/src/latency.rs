//! Histogram-based round-trip latency collector.
//!
//! Each session owns one `LatencyCollector` fed by the heartbeat: every
//! successful ping records the time between writing the ping and receiving
//! its reply. Statistics (min, max, average, p50/p90/p99) are computed on
//! demand.
//!
//! The histogram uses fixed 1ms bins up to 5s (5000 bins). Samples above 5s
//! are clamped to the last bin.

use std::time::Duration;

/// Width of each histogram bin in microseconds.
const BIN_WIDTH_US: u64 = 1_000;

/// Number of histogram bins (covers 0–5s).
const NUM_BINS: usize = 5_000;

/// Computed latency statistics.
#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub count: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub avg_us: f64,
    pub p50_us: u64,
    pub p90_us: u64,
    pub p99_us: u64,
}

impl std::fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n={} min={:.1}ms max={:.1}ms avg={:.1}ms p50={}ms p90={}ms p99={}ms",
            self.count,
            self.min_us as f64 / 1_000.0,
            self.max_us as f64 / 1_000.0,
            self.avg_us / 1_000.0,
            self.p50_us / 1_000,
            self.p90_us / 1_000,
            self.p99_us / 1_000,
        )
    }
}

/// A histogram-based latency collector.
///
/// Not thread-safe; the session keeps it behind a mutex.
pub struct LatencyCollector {
    bins: Vec<u64>,
    count: u64,
    sum: u64,
    min: u64,
    max: u64,
    last: Option<Duration>,
}

impl LatencyCollector {
    pub fn new() -> Self {
        Self { bins: vec![0u64; NUM_BINS], count: 0, sum: 0, min: u64::MAX, max: 0, last: None }
    }

    /// Record one round trip.
    pub fn record(&mut self, rtt: Duration) {
        let us = u64::try_from(rtt.as_micros()).unwrap_or(u64::MAX);
        self.count += 1;
        self.sum = self.sum.saturating_add(us);
        self.min = self.min.min(us);
        self.max = self.max.max(us);
        self.last = Some(rtt);

        let bin = ((us / BIN_WIDTH_US) as usize).min(NUM_BINS - 1);
        self.bins[bin] += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<Duration> {
        self.last
    }

    /// Compute summary statistics. Returns `None` if no samples recorded.
    pub fn stats(&self) -> Option<LatencyStats> {
        if self.count == 0 {
            return None;
        }
        Some(LatencyStats {
            count: self.count,
            min_us: self.min,
            max_us: self.max,
            avg_us: self.sum as f64 / self.count as f64,
            p50_us: self.percentile(0.50),
            p90_us: self.percentile(0.90),
            p99_us: self.percentile(0.99),
        })
    }

    pub fn reset(&mut self) {
        self.bins.fill(0);
        self.count = 0;
        self.sum = 0;
        self.min = u64::MAX;
        self.max = 0;
        self.last = None;
    }

    /// Upper edge of the bin holding the given percentile (0.0–1.0).
    fn percentile(&self, pct: f64) -> u64 {
        let target = ((self.count as f64 * pct).ceil() as u64).max(1);
        let mut cumulative = 0u64;
        for (i, &count) in self.bins.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return ((i as u64 + 1) * BIN_WIDTH_US).min(self.max);
            }
        }
        self.max
    }
}

impl Default for LatencyCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn basic_stats() {
        let mut lc = LatencyCollector::new();
        for i in 1..=100 {
            lc.record(ms(i));
        }
        let stats = lc.stats().unwrap();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.min_us, 1_000);
        assert_eq!(stats.max_us, 100_000);
        assert!(stats.avg_us > 50_000.0 && stats.avg_us < 51_000.0);
        assert!(stats.p50_us >= 50_000 && stats.p50_us <= 51_000);
        assert!(stats.p99_us >= 99_000);
        assert_eq!(lc.last(), Some(ms(100)));
    }

    #[test]
    fn empty_and_reset() {
        let mut lc = LatencyCollector::new();
        assert!(lc.stats().is_none());
        lc.record(ms(3));
        lc.reset();
        assert_eq!(lc.count(), 0);
        assert!(lc.last().is_none());
        assert!(lc.stats().is_none());
    }

    #[test]
    fn slow_samples_clamp_to_last_bin() {
        let mut lc = LatencyCollector::new();
        lc.record(Duration::from_secs(30));
        let stats = lc.stats().unwrap();
        assert_eq!(stats.max_us, 30_000_000);
        assert_eq!(stats.p50_us, 5_000_000);
    }
}
