//! The build pipeline: fetch → precompute → compute.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use configforge_inventory::AssetSource;
use configforge_report::ReportSender;
use configforge_shared::{BuildStats, ConfigForgeError, MessageKind, Result};

use crate::compute::compute;
use crate::precompute::precompute;
use crate::store::ArtifactSet;

/// Run one full build cycle.
///
/// Stats are returned alongside the result so a failed cycle still reports
/// the durations it reached; on failure only the fields computed before the
/// failure are meaningful. An error always comes with no artifact set — a
/// partially built mapping never leaks to the caller.
#[instrument(skip_all)]
pub async fn run_build<S: AssetSource>(
    source: &S,
    report: &ReportSender,
    all_devices_must_build: bool,
) -> (BuildStats, Result<ArtifactSet>) {
    let mut stats = BuildStats::default();
    let start = Instant::now();

    // Fetch. Any failure here aborts the cycle before precompute.
    let assets = match source.fetch_assets(report).await {
        Ok(assets) => assets,
        Err(err) => return (stats, Err(err)),
    };
    assets.print_stats();
    assets.report_stats(report).await;
    let fetch_done = Instant::now();
    stats.fetch_duration = fetch_done.duration_since(start);

    // Precompute one model per device.
    let (models, precompute_error) = precompute(report, &assets).await;
    let precompute_done = Instant::now();
    stats.precompute_duration = precompute_done.duration_since(fetch_done);

    if let Some(err) = precompute_error {
        if all_devices_must_build {
            warn!(failed = err.len(), "aborting: all devices must build");
            return (stats, Err(ConfigForgeError::AllDevicesMustBuild));
        }
        warn!(failed = err.len(), "continuing with partial fleet");
        report
            .warning(MessageKind::Precompute, "build failed for some devices")
            .await;
    }

    // Generate artifacts for all valid devices.
    let (successfully_built, compute_result) = compute(report, models).await;
    let compute_done = Instant::now();
    stats.compute_duration = compute_done.duration_since(precompute_done);
    stats.total_duration = compute_done.duration_since(start);
    stats.built_devices = successfully_built;

    info!(
        built = stats.built_devices,
        fetch_ms = stats.fetch_duration.as_millis(),
        precompute_ms = stats.precompute_duration.as_millis(),
        compute_ms = stats.compute_duration.as_millis(),
        total_ms = stats.total_duration.as_millis(),
        "build finished"
    );

    match compute_result {
        Ok(built) => (stats, Ok(Arc::new(built))),
        Err(err) => (stats, Err(err)),
    }
}
