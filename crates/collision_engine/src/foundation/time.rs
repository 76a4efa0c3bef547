//! Time management utilities
//!
//! The worker thread uses these to attribute time to each phase of a tick.

use std::time::{Duration, Instant};

/// Measures time since it was started
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Create a stopwatch that is already running
    pub fn start_new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Time since [`start_new`](Self::start_new)
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Accumulated timing for one repeated phase of work
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTiming {
    /// Number of samples recorded
    pub samples: u64,
    /// Sum of all samples
    pub total: Duration,
    /// Longest single sample
    pub max: Duration,
}

impl PhaseTiming {
    /// Record one sample
    pub fn record(&mut self, sample: Duration) {
        self.samples += 1;
        self.total += sample;
        self.max = self.max.max(sample);
    }

    /// Average sample in milliseconds, zero when nothing was recorded
    pub fn average_millis(&self) -> f32 {
        if self.samples == 0 {
            0.0
        } else {
            self.total.as_secs_f32() * 1000.0 / self.samples as f32
        }
    }

    /// Longest sample in milliseconds
    pub fn max_millis(&self) -> f32 {
        self.max.as_secs_f32() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwatch_measures_since_start() {
        let stopwatch = Stopwatch::start_new();
        std::thread::sleep(Duration::from_millis(2));
        let first = stopwatch.elapsed();
        assert!(first >= Duration::from_millis(2));
        assert!(stopwatch.elapsed() >= first);
    }

    #[test]
    fn test_phase_timing_average_and_max() {
        let mut timing = PhaseTiming::default();
        assert_eq!(timing.average_millis(), 0.0);

        timing.record(Duration::from_millis(2));
        timing.record(Duration::from_millis(4));

        assert_eq!(timing.samples, 2);
        assert!((timing.average_millis() - 3.0).abs() < 1e-3);
        assert!((timing.max_millis() - 4.0).abs() < 1e-3);
    }
}
