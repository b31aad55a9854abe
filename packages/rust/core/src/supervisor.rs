//! The build supervisor: reruns the pipeline forever, on interval or
//! external trigger, streaming progress into the report store.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info};

use configforge_inventory::AssetSource;
use configforge_report::{ReportSender, ReportStore};
use configforge_shared::{BuildConfig, BuildStatus};

use crate::metrics::MetricsRegistry;
use crate::pipeline::run_build;
use crate::store::ConfigStore;

/// Owns the build loop and the process-wide build state around it.
///
/// The trigger channel drives the loop's lifetime: a `()` signal starts the
/// next cycle immediately, and closing the channel (dropping every sender)
/// is the only way to stop the loop. A cycle in progress always runs to
/// completion before shutdown is honored.
pub struct BuildSupervisor<S: AssetSource> {
    source: S,
    config: BuildConfig,
    report: ReportStore,
    store: ConfigStore,
    metrics: Arc<MetricsRegistry>,
}

impl<S: AssetSource> BuildSupervisor<S> {
    /// Create a supervisor around an asset source and build settings.
    pub fn new(source: S, config: BuildConfig) -> Self {
        Self {
            source,
            config,
            report: ReportStore::new(),
            store: ConfigStore::new(),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// The live report store (for a query surface).
    pub fn report(&self) -> &ReportStore {
        &self.report
    }

    /// The published artifact store (for the serving layer).
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// The metrics registry (for an export backend).
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Run build cycles until the trigger channel is closed.
    pub async fn run(&self, mut trigger: mpsc::Receiver<()>) {
        loop {
            self.run_cycle().await;

            tokio::select! {
                _ = sleep(self.config.interval()) => {}
                signal = trigger.recv() => match signal {
                    Some(()) => info!("build triggered externally"),
                    None => {
                        info!("trigger channel closed, stopping build loop");
                        return;
                    }
                },
            }
        }
    }

    /// One full cycle: report lifecycle, observer, pipeline, publication.
    async fn run_cycle(&self) {
        self.report.start_new_report().await;

        let (tx, rx) = mpsc::channel(self.config.report_channel_capacity.max(1));
        let observer = tokio::spawn({
            let report = self.report.clone();
            async move { report.watch(rx).await }
        });

        self.report.update_status(BuildStatus::InProgress).await;
        let sender = ReportSender::new(tx);
        let (stats, result) =
            run_build(&self.source, &sender, self.config.all_devices_must_build).await;

        match result {
            Ok(artifacts) => {
                // Publish atomically; readers never see a partial set.
                self.store.set(artifacts).await;

                self.metrics.build_successful();
                self.metrics.set_built_devices(stats.built_devices);

                self.report.update_status(BuildStatus::Success).await;
                self.report.update_stats(stats.clone()).await;
                self.report.mark_as_successful().await;

                info!(built = stats.built_devices, "build successful");
            }
            Err(err) => {
                // Previous artifact set stays published: stale beats none.
                self.metrics.build_failed();

                self.report.update_status(BuildStatus::Failed).await;
                self.report.update_stats(stats.clone()).await;

                error!(error = %err, "build failed");
            }
        }

        self.metrics
            .set_fetch_duration(stats.fetch_duration.as_secs_f64());
        self.metrics
            .set_precompute_duration(stats.precompute_duration.as_secs_f64());
        self.metrics
            .set_compute_duration(stats.compute_duration.as_secs_f64());
        self.metrics
            .set_total_duration(stats.total_duration.as_secs_f64());

        self.report.mark_as_complete().await;

        // Close the per-cycle channel and let the observer finish draining.
        drop(sender);
        if let Err(err) = observer.await {
            error!(error = %err, "report observer task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use configforge_inventory::StaticAssetSource;
    use configforge_shared::{DeviceRecord, InterfaceRecord};

    fn record(hostname: &str) -> DeviceRecord {
        DeviceRecord {
            hostname: hostname.into(),
            site: "dc1".into(),
            role: "leaf".into(),
            platform: "eos".into(),
            management_address: "10.0.0.1".into(),
        }
    }

    fn iface(device: &str, address: &str) -> InterfaceRecord {
        InterfaceRecord {
            device: device.into(),
            name: "Ethernet1".into(),
            description: None,
            address: Some(address.into()),
            enabled: true,
        }
    }

    fn good_source() -> StaticAssetSource {
        StaticAssetSource {
            devices: vec![record("leaf-01")],
            interfaces: vec![iface("leaf-01", "192.0.2.1/31")],
            bgp_sessions: vec![],
        }
    }

    fn bad_source() -> StaticAssetSource {
        // Invalid CIDR: precompute passes, compute fails.
        StaticAssetSource {
            devices: vec![record("leaf-01")],
            interfaces: vec![iface("leaf-01", "bogus")],
            bgp_sessions: vec![],
        }
    }

    fn test_config() -> BuildConfig {
        BuildConfig {
            // Long enough that only triggers advance the loop during tests.
            interval_secs: 3600,
            all_devices_must_build: false,
            report_channel_capacity: 64,
        }
    }

    async fn wait_for(mut condition: impl AsyncFnMut() -> bool) {
        for _ in 0..500 {
            if condition().await {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn successful_cycle_publishes_and_reports() {
        let supervisor = Arc::new(BuildSupervisor::new(good_source(), test_config()));
        let (tx, rx) = mpsc::channel(4);

        let handle = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.run(rx).await }
        });

        wait_for(async || supervisor.metrics().snapshot().builds_successful >= 1).await;

        let published = supervisor.store().get().await;
        assert!(published.contains_key("leaf-01"));

        let report = supervisor.report().snapshot().await;
        assert_eq!(report.status, BuildStatus::Success);
        assert!(report.last_successful_at.is_some());
        assert!(report.completed_at.is_some());
        assert_eq!(report.stats.as_ref().map(|s| s.built_devices), Some(1));

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits after trigger close")
            .expect("supervisor task");
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_artifacts() {
        let supervisor = Arc::new(BuildSupervisor::new(bad_source(), test_config()));
        let (tx, rx) = mpsc::channel(4);

        let handle = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.run(rx).await }
        });

        wait_for(async || supervisor.metrics().snapshot().builds_failed >= 1).await;

        // The store was empty before the failed cycle and must stay empty.
        assert!(supervisor.store().get().await.is_empty());

        let report = supervisor.report().snapshot().await;
        assert_eq!(report.status, BuildStatus::Failed);
        assert!(report.last_successful_at.is_none());
        assert!(
            report
                .messages
                .iter()
                .any(|m| m.severity == configforge_shared::Severity::Error)
        );

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits")
            .expect("supervisor task");
    }

    #[tokio::test]
    async fn trigger_starts_next_cycle_without_waiting() {
        let supervisor = Arc::new(BuildSupervisor::new(good_source(), test_config()));
        let (tx, rx) = mpsc::channel(4);

        let handle = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.run(rx).await }
        });

        // Queue a trigger; the interval is an hour, so a second completed
        // cycle can only come from the trigger.
        tx.send(()).await.expect("send trigger");

        wait_for(async || supervisor.metrics().snapshot().builds_successful >= 2).await;

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits")
            .expect("supervisor task");
    }

    #[tokio::test]
    async fn closing_trigger_stops_after_inflight_cycle() {
        let supervisor = Arc::new(BuildSupervisor::new(good_source(), test_config()));
        let (tx, rx) = mpsc::channel(4);

        let handle = tokio::spawn({
            let supervisor = Arc::clone(&supervisor);
            async move { supervisor.run(rx).await }
        });

        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits")
            .expect("supervisor task");

        // The in-flight first cycle completed before shutdown.
        let snap = supervisor.metrics().snapshot();
        assert_eq!(snap.builds_successful, 1);
        let report = supervisor.report().snapshot().await;
        assert!(report.completed_at.is_some());
    }
}
