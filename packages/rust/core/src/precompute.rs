//! Precompute stage: one device model (or failure marker) per inventory
//! record.

use std::collections::HashMap;

use tracing::info;

use configforge_device::DeviceModel;
use configforge_inventory::Assets;
use configforge_report::ReportSender;
use configforge_shared::{AggregateError, MessageKind};

/// Precompute output: hostname → model, with `None` marking a device whose
/// model could not be built.
pub type ModelMap = HashMap<String, Option<DeviceModel>>;

/// Build one model per device from the shared precomputed context.
///
/// Always completes with exactly one entry per inventory record; per-device
/// failure is never fatal to the stage. Returns the aggregate of every
/// individual failure cause, or `None` if all devices built.
pub async fn precompute(report: &ReportSender, assets: &Assets) -> (ModelMap, Option<AggregateError>) {
    info!("start precompute");
    let ctx = assets.precompute();

    let mut models = ModelMap::with_capacity(assets.devices.len());
    let mut failures = AggregateError::new();

    for record in &assets.devices {
        let hostname = record.hostname.clone();
        match DeviceModel::new(record.clone(), &ctx) {
            Ok(model) => {
                models.insert(hostname, Some(model));
            }
            Err(err) => {
                report.error(MessageKind::Precompute, err.to_string()).await;
                failures.push(err);
                models.insert(hostname, None);
            }
        }
    }

    (models, failures.into_result().err())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use configforge_shared::{DeviceRecord, InterfaceRecord, ReportMessage, Severity};
    use tokio::sync::mpsc;

    fn record(hostname: &str) -> DeviceRecord {
        DeviceRecord {
            hostname: hostname.into(),
            site: "dc1".into(),
            role: "leaf".into(),
            platform: "eos".into(),
            management_address: "10.0.0.1".into(),
        }
    }

    fn iface(device: &str) -> InterfaceRecord {
        InterfaceRecord {
            device: device.into(),
            name: "Ethernet1".into(),
            description: None,
            address: Some("192.0.2.1/31".into()),
            enabled: true,
        }
    }

    fn report_pair() -> (ReportSender, mpsc::Receiver<ReportMessage>) {
        let (tx, rx) = mpsc::channel(64);
        (ReportSender::new(tx), rx)
    }

    #[tokio::test]
    async fn one_entry_per_device() {
        // leaf-03 has no interfaces and must fail precompute.
        let assets = Assets {
            devices: vec![record("leaf-01"), record("leaf-02"), record("leaf-03")],
            interfaces: vec![iface("leaf-01"), iface("leaf-02")],
            bgp_sessions: vec![],
            fetched_at: Utc::now(),
        };

        let (report, mut rx) = report_pair();
        let (models, error) = precompute(&report, &assets).await;
        drop(report);

        assert_eq!(models.len(), 3);
        assert!(models["leaf-01"].is_some());
        assert!(models["leaf-02"].is_some());
        assert!(models["leaf-03"].is_none());

        let error = error.expect("aggregate error");
        assert_eq!(error.len(), 1);
        assert!(error.to_string().contains("leaf-03"));

        let mut errors = 0;
        while let Some(msg) = rx.recv().await {
            if msg.severity == Severity::Error {
                assert!(msg.text.contains("leaf-03"));
                errors += 1;
            }
        }
        assert_eq!(errors, 1);
    }

    #[tokio::test]
    async fn all_devices_valid_means_no_error() {
        let assets = Assets {
            devices: vec![record("leaf-01")],
            interfaces: vec![iface("leaf-01")],
            bgp_sessions: vec![],
            fetched_at: Utc::now(),
        };

        let (report, _rx) = report_pair();
        let (models, error) = precompute(&report, &assets).await;

        assert_eq!(models.len(), 1);
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn every_cause_is_retained() {
        let assets = Assets {
            devices: vec![record("leaf-01"), record("leaf-02")],
            interfaces: vec![],
            bgp_sessions: vec![],
            fetched_at: Utc::now(),
        };

        let (report, _rx) = report_pair();
        let (models, error) = precompute(&report, &assets).await;

        assert_eq!(models.len(), 2);
        assert!(models.values().all(Option::is_none));

        let error = error.expect("aggregate error");
        assert_eq!(error.len(), 2);
    }
}
