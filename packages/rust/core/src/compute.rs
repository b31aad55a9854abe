//! Compute stage: concurrent per-device artifact generation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tracing::info;

use configforge_device::DeviceModel;
use configforge_report::ReportSender;
use configforge_shared::{ConfigForgeError, MessageKind, Result};

use crate::precompute::ModelMap;

// ---------------------------------------------------------------------------
// BuildTally
// ---------------------------------------------------------------------------

/// Cycle-local state shared by the parallel compute tasks: a success counter
/// and a sticky failure flag.
#[derive(Debug, Default)]
struct BuildTally {
    built: AtomicU32,
    failed: AtomicBool,
}

impl BuildTally {
    /// Count one task that completed without error.
    fn record_success(&self) {
        self.built.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark the stage failed. Once set, never cleared within the cycle.
    fn record_failure(&self) {
        self.failed.store(true, Ordering::Relaxed);
    }

    fn built(&self) -> u32 {
        self.built.load(Ordering::Relaxed)
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Compute stage
// ---------------------------------------------------------------------------

/// Generate the configuration artifact for every device with a valid model.
///
/// Devices carrying a failure marker are skipped with a warning and never
/// count as a stage failure. Each valid model runs in its own task; the
/// stage blocks until all of them finish. Returns the success count and the
/// built map, or a stage error if any task failed — individual task errors
/// surface only through the report channel.
pub async fn compute(
    report: &ReportSender,
    models: ModelMap,
) -> (u32, Result<HashMap<String, Arc<DeviceModel>>>) {
    let tally = Arc::new(BuildTally::default());
    let mut handles = Vec::with_capacity(models.len());

    for (hostname, model) in models {
        let Some(mut model) = model else {
            report
                .warning(
                    MessageKind::Compute,
                    format!("device {hostname} has no configuration"),
                )
                .await;
            continue;
        };

        let report = report.clone();
        let tally = Arc::clone(&tally);

        handles.push(tokio::spawn(async move {
            match model.generate_configs() {
                Ok(()) => {
                    tally.record_success();
                    Some((hostname, Arc::new(model)))
                }
                Err(err) => {
                    report.error(MessageKind::Compute, err.to_string()).await;
                    tally.record_failure();
                    None
                }
            }
        }));
    }

    // Barrier: every dispatched task must finish before the stage returns.
    let mut built = HashMap::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(Some((hostname, model))) => {
                built.insert(hostname, model);
            }
            Ok(None) => {}
            Err(err) => {
                report
                    .error(MessageKind::Compute, format!("compute task failed: {err}"))
                    .await;
                tally.record_failure();
            }
        }
    }

    let successfully_built = tally.built();
    info!(built = successfully_built, "compute finished");

    if tally.failed() {
        (successfully_built, Err(ConfigForgeError::ComputeFailed))
    } else {
        (successfully_built, Ok(built))
    }
}
