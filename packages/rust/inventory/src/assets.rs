//! The fetched inventory bundle and its per-cycle precomputed index.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use configforge_report::ReportSender;
use configforge_shared::{BgpSessionRecord, DeviceRecord, InterfaceRecord, MessageKind};

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Everything fetched from the source of truth for one build cycle.
#[derive(Debug, Clone)]
pub struct Assets {
    /// The device inventory. One entry per managed device.
    pub devices: Vec<DeviceRecord>,
    /// All interface rows across the fleet.
    pub interfaces: Vec<InterfaceRecord>,
    /// All BGP session rows across the fleet.
    pub bgp_sessions: Vec<BgpSessionRecord>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

impl Assets {
    /// Log fetch statistics through tracing.
    pub fn print_stats(&self) {
        info!(
            devices = self.devices.len(),
            interfaces = self.interfaces.len(),
            bgp_sessions = self.bgp_sessions.len(),
            "inventory fetched"
        );
    }

    /// Emit fetch statistics into the report channel.
    pub async fn report_stats(&self, report: &ReportSender) {
        report
            .info(
                MessageKind::Fetch,
                format!(
                    "fetched {} devices, {} interfaces, {} BGP sessions",
                    self.devices.len(),
                    self.interfaces.len(),
                    self.bgp_sessions.len()
                ),
            )
            .await;
    }

    /// Index the raw assets by hostname so each device can be built
    /// independently from the shared, read-only context.
    pub fn precompute(&self) -> PrecomputedContext {
        let mut interfaces_by_device: HashMap<String, Vec<InterfaceRecord>> = HashMap::new();
        for iface in &self.interfaces {
            interfaces_by_device
                .entry(iface.device.clone())
                .or_default()
                .push(iface.clone());
        }

        let mut sessions_by_device: HashMap<String, Vec<BgpSessionRecord>> = HashMap::new();
        for session in &self.bgp_sessions {
            sessions_by_device
                .entry(session.device.clone())
                .or_default()
                .push(session.clone());
        }

        PrecomputedContext {
            interfaces_by_device,
            sessions_by_device,
        }
    }
}

// ---------------------------------------------------------------------------
// PrecomputedContext
// ---------------------------------------------------------------------------

/// Per-cycle index of the raw assets, shared read-only across all
/// per-device work.
#[derive(Debug, Default)]
pub struct PrecomputedContext {
    interfaces_by_device: HashMap<String, Vec<InterfaceRecord>>,
    sessions_by_device: HashMap<String, Vec<BgpSessionRecord>>,
}

impl PrecomputedContext {
    /// The interface rows belonging to `hostname`. Empty if none.
    pub fn interfaces_for(&self, hostname: &str) -> &[InterfaceRecord] {
        self.interfaces_by_device
            .get(hostname)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The BGP session rows belonging to `hostname`. Empty if none.
    pub fn sessions_for(&self, hostname: &str) -> &[BgpSessionRecord] {
        self.sessions_by_device
            .get(hostname)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
