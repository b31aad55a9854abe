//! In-process build metrics.
//!
//! The emission backend (scrape endpoint, push gateway, …) is an external
//! collaborator; this registry is the interface the supervisor drives, and
//! [`MetricsRegistry::snapshot`] is what a backend would export.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters and gauges covering the build loop.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    builds_successful: AtomicU64,
    builds_failed: AtomicU64,
    built_devices: AtomicU64,
    // Durations in seconds, stored as f64 bit patterns.
    fetch_seconds: AtomicU64,
    precompute_seconds: AtomicU64,
    compute_seconds: AtomicU64,
    total_seconds: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all values at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successful build cycle.
    pub fn build_successful(&self) {
        self.builds_successful.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed build cycle.
    pub fn build_failed(&self) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Gauge: devices built in the last successful cycle.
    pub fn set_built_devices(&self, count: u32) {
        self.built_devices.store(u64::from(count), Ordering::Relaxed);
    }

    /// Gauge: last fetch stage duration.
    pub fn set_fetch_duration(&self, seconds: f64) {
        self.fetch_seconds.store(seconds.to_bits(), Ordering::Relaxed);
    }

    /// Gauge: last precompute stage duration.
    pub fn set_precompute_duration(&self, seconds: f64) {
        self.precompute_seconds
            .store(seconds.to_bits(), Ordering::Relaxed);
    }

    /// Gauge: last compute stage duration.
    pub fn set_compute_duration(&self, seconds: f64) {
        self.compute_seconds
            .store(seconds.to_bits(), Ordering::Relaxed);
    }

    /// Gauge: last total cycle duration.
    pub fn set_total_duration(&self, seconds: f64) {
        self.total_seconds.store(seconds.to_bits(), Ordering::Relaxed);
    }

    /// A consistent-enough copy of all values for export.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            builds_successful: self.builds_successful.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            built_devices: self.built_devices.load(Ordering::Relaxed),
            fetch_seconds: f64::from_bits(self.fetch_seconds.load(Ordering::Relaxed)),
            precompute_seconds: f64::from_bits(self.precompute_seconds.load(Ordering::Relaxed)),
            compute_seconds: f64::from_bits(self.compute_seconds.load(Ordering::Relaxed)),
            total_seconds: f64::from_bits(self.total_seconds.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time export of the registry.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub builds_successful: u64,
    pub builds_failed: u64,
    pub built_devices: u64,
    pub fetch_seconds: f64,
    pub precompute_seconds: f64,
    pub compute_seconds: f64,
    pub total_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let registry = MetricsRegistry::new();
        registry.build_successful();
        registry.build_successful();
        registry.build_failed();

        let snap = registry.snapshot();
        assert_eq!(snap.builds_successful, 2);
        assert_eq!(snap.builds_failed, 1);
    }

    #[test]
    fn duration_gauges_roundtrip_f64() {
        let registry = MetricsRegistry::new();
        registry.set_fetch_duration(1.25);
        registry.set_total_duration(3.5);
        registry.set_built_devices(120);

        let snap = registry.snapshot();
        assert_eq!(snap.fetch_seconds, 1.25);
        assert_eq!(snap.total_seconds, 3.5);
        assert_eq!(snap.built_devices, 120);
    }

    #[test]
    fn snapshot_serializes() {
        let registry = MetricsRegistry::new();
        let json = serde_json::to_string(&registry.snapshot()).expect("serialize");
        assert!(json.contains("builds_successful"));
    }
}
