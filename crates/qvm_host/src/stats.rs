//! Latency statistics for capture benchmarking.
//!
//! Accumulates per-capture latency measurements and reports min, max,
//! average, and a coarse distribution. Designed for high-frequency updates
//! in the benchmark loop, using simple arithmetic to keep measurement
//! overhead out of the numbers being measured.

/// Tracks capture latency with minimal overhead.
pub struct LatencyStats {
    pub min: u64,
    pub max: u64,
    pub sum: u64,
    pub count: u64,
    pub buckets: [u64; 20],
}

impl LatencyStats {
    /// Empty tracker; min starts at `u64::MAX` so the first measurement
    /// becomes the minimum.
    pub fn new() -> Self {
        Self {
            min: u64::MAX,
            max: 0,
            sum: 0,
            count: 0,
            buckets: [0; 20],
        }
    }

    /// Records one capture latency in nanoseconds.
    ///
    /// Buckets are sized at one microsecond; everything past 19 us lands
    /// in the final bucket.
    pub fn update(&mut self, nanos: u64) {
        if nanos < self.min {
            self.min = nanos;
        }
        if nanos > self.max {
            self.max = nanos;
        }
        self.sum += nanos;
        self.count += 1;

        let idx = (nanos / 1_000).min(19) as usize;
        self.buckets[idx] += 1;
    }

    /// Average latency in nanoseconds, 0.0 before any measurement.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Prints the summary and distribution report.
    pub fn print_report(&self) {
        println!("\nCapture Latency");
        println!("Count: {}", self.count);

        let avg_ns = self.avg();
        if avg_ns < 1000.0 {
            println!("Min:   {:.2} ns", self.min as f64);
            println!("Avg:   {:.2} ns", avg_ns);
            println!("Max:   {:.2} ns", self.max as f64);
        } else {
            println!("Min:   {:.2} us", self.min as f64 / 1000.0);
            println!("Avg:   {:.2} us", avg_ns / 1000.0);
            println!("Max:   {:.2} us", self.max as f64 / 1000.0);
        }

        println!("Distribution (1us buckets):");
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                let open_end = if i == 19 { ">" } else { "" };
                println!("[{:2}-{:2}{} us]: {}", i, i + 1, open_end, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_extremes_and_average() {
        let mut stats = LatencyStats::new();
        stats.update(100);
        stats.update(300);
        stats.update(200);

        assert_eq!(stats.min, 100);
        assert_eq!(stats.max, 300);
        assert_eq!(stats.avg(), 200.0);
        assert_eq!(stats.count, 3);
    }

    #[test]
    fn overlong_latencies_land_in_the_last_bucket() {
        let mut stats = LatencyStats::new();
        stats.update(50_000_000);
        assert_eq!(stats.buckets[19], 1);
    }
}
