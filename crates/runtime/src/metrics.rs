use std::time::Duration;

use serde::Serialize;

/// Running min/max/sum/count summary of recorded samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Histogram {
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
}

impl Histogram {
    pub fn record(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

/// Timing and count statistics gathered over one load session.
///
/// Durations are stored in whole microseconds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoadStats {
    pub payload_bytes: u64,
    pub fetch_us: u64,
    pub parse_us: u64,
    pub chunks: u64,
    pub features: u64,
    /// Per-chunk sink append time.
    pub append_us: Histogram,
}

impl LoadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&mut self, bytes: usize, elapsed: Duration) {
        self.payload_bytes = bytes as u64;
        self.fetch_us = micros(elapsed);
    }

    pub fn record_parse(&mut self, elapsed: Duration) {
        self.parse_us = micros(elapsed);
    }

    pub fn record_chunk(&mut self, features: usize, elapsed: Duration) {
        self.chunks += 1;
        self.features += features as u64;
        self.append_us.record(micros(elapsed));
    }

    pub fn fetch_time(&self) -> Duration {
        Duration::from_micros(self.fetch_us)
    }

    pub fn parse_time(&self) -> Duration {
        Duration::from_micros(self.parse_us)
    }

    pub fn append_time(&self) -> Duration {
        Duration::from_micros(self.append_us.sum)
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Histogram, LoadStats};

    #[test]
    fn histogram_tracks_min_max_sum_count() {
        let mut h = Histogram::default();
        assert_eq!(h.mean(), None);
        h.record(5);
        h.record(2);
        h.record(8);
        assert_eq!(h.count, 3);
        assert_eq!(h.sum, 15);
        assert_eq!(h.min, 2);
        assert_eq!(h.max, 8);
        assert_eq!(h.mean(), Some(5.0));
    }

    #[test]
    fn chunk_records_accumulate() {
        let mut s = LoadStats::new();
        s.record_fetch(4096, Duration::from_millis(3));
        s.record_parse(Duration::from_micros(750));
        s.record_chunk(1000, Duration::from_micros(100));
        s.record_chunk(500, Duration::from_micros(40));

        assert_eq!(s.payload_bytes, 4096);
        assert_eq!(s.fetch_time(), Duration::from_millis(3));
        assert_eq!(s.parse_time(), Duration::from_micros(750));
        assert_eq!(s.chunks, 2);
        assert_eq!(s.features, 1500);
        assert_eq!(s.append_us.min, 40);
        assert_eq!(s.append_time(), Duration::from_micros(140));
    }
}
