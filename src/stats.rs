//! Statistics tracking for the resolver.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for completed queries.
pub struct Stats {
    pub requests: AtomicU64,
    pub resolved: AtomicU64,
    pub blocked: AtomicU64,
    pub failed: AtomicU64,
    /// Upstream round trips across all resolved queries.
    hops: AtomicU64,
    /// Cumulative response time in microseconds for averaging.
    total_response_time_us: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            resolved: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            hops: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
        }
    }

    pub fn record_resolved(&self, response_time_ms: f64, hops: usize) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
        self.hops.fetch_add(hops as u64, Ordering::Relaxed);
        self.record_request(response_time_ms);
    }

    pub fn record_blocked(&self, response_time_ms: f64) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
        self.record_request(response_time_ms);
    }

    pub fn record_failed(&self, response_time_ms: f64) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record_request(response_time_ms);
    }

    fn record_request(&self, response_time_ms: f64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add((response_time_ms * 1000.0) as u64, Ordering::Relaxed);
    }

    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        let requests = self.requests.swap(0, Ordering::Relaxed);
        let resolved = self.resolved.swap(0, Ordering::Relaxed);
        let blocked = self.blocked.swap(0, Ordering::Relaxed);
        let failed = self.failed.swap(0, Ordering::Relaxed);
        let hops = self.hops.swap(0, Ordering::Relaxed);
        let total_us = self.total_response_time_us.swap(0, Ordering::Relaxed);

        let avg_response_ms = if requests > 0 {
            (total_us as f64 / requests as f64) / 1000.0
        } else {
            0.0
        };
        let avg_hops = if resolved > 0 {
            hops as f64 / resolved as f64
        } else {
            0.0
        };

        StatsSnapshot {
            requests,
            resolved,
            blocked,
            failed,
            avg_hops,
            avg_response_ms,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub resolved: u64,
    pub blocked: u64,
    pub failed: u64,
    pub avg_hops: f64,
    pub avg_response_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_averages_and_resets() {
        let stats = Stats::new();
        stats.record_resolved(10.0, 3);
        stats.record_resolved(30.0, 1);
        stats.record_blocked(2.0);
        stats.record_failed(6.0);

        let snapshot = stats.snapshot_and_reset();

        assert_eq!(snapshot.requests, 4);
        assert_eq!(snapshot.resolved, 2);
        assert_eq!(snapshot.blocked, 1);
        assert_eq!(snapshot.failed, 1);
        assert!((snapshot.avg_hops - 2.0).abs() < 1e-9);
        assert!((snapshot.avg_response_ms - 12.0).abs() < 1e-6);

        let empty = stats.snapshot_and_reset();
        assert_eq!(empty.requests, 0);
        assert_eq!(empty.avg_response_ms, 0.0);
    }
}
