//! Progress reporting for long scans

use tracing::info;

/// Rows in a 31-day month of per-minute readings
pub const MONTH_OF_MINUTES: u64 = 31 * 24 * 60;

/// Receives the running row count of a scan; counts only ever increase
pub trait Progress {
    fn advance(&mut self, rows: u64);

    fn finish(&mut self, _rows: u64) {}
}

/// Discards progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&mut self, _rows: u64) {}
}

/// Logs every `every` rows against an expected total
#[derive(Debug, Clone)]
pub struct LogProgress {
    every: u64,
    expected: u64,
}

impl LogProgress {
    pub fn new(every: u64, expected: u64) -> Self {
        Self {
            every: every.max(1),
            expected: expected.max(1),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(10_000, MONTH_OF_MINUTES)
    }
}

impl Progress for LogProgress {
    fn advance(&mut self, rows: u64) {
        if rows % self.every == 0 {
            info!(
                "{} rows processed (expected progress {:.2}%)",
                rows,
                rows as f64 / self.expected as f64 * 100.0
            );
        }
    }

    fn finish(&mut self, rows: u64) {
        info!("Scan finished after {} rows", rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call for assertions
    #[derive(Default)]
    struct Recorder(Vec<u64>);

    impl Progress for Recorder {
        fn advance(&mut self, rows: u64) {
            self.0.push(rows);
        }
    }

    #[test]
    fn test_default_finish_is_noop() {
        let mut r = Recorder::default();
        r.advance(1);
        r.advance(2);
        r.finish(2);
        assert_eq!(r.0, vec![1, 2]);
    }

    #[test]
    fn test_log_progress_never_divides_by_zero() {
        let mut p = LogProgress::new(0, 0);
        p.advance(1);
        p.finish(1);
    }
}
