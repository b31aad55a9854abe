//! Core domain types for configforge build cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CycleId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for build cycle identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(pub Uuid);

impl CycleId {
    /// Generate a new time-sortable cycle identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CycleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Inventory records
// ---------------------------------------------------------------------------

/// One device row from the source of truth. Hostname is the unique key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Unique device hostname.
    pub hostname: String,
    /// Site / datacenter the device lives in.
    pub site: String,
    /// Fleet role (e.g., `spine`, `leaf`, `edge`).
    pub role: String,
    /// Vendor platform identifier.
    pub platform: String,
    /// Management address, as reported upstream.
    pub management_address: String,
}

/// One interface row, tied to a device by hostname.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// Owning device hostname.
    pub device: String,
    /// Interface name (e.g., `Ethernet1/1`).
    pub name: String,
    /// Interface description.
    #[serde(default)]
    pub description: Option<String>,
    /// Assigned address in CIDR notation, if any.
    #[serde(default)]
    pub address: Option<String>,
    /// Whether the interface is administratively enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// One BGP session row, tied to a device by hostname.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BgpSessionRecord {
    /// Owning device hostname.
    pub device: String,
    /// Local address the session binds to.
    pub local_address: String,
    /// Peer address.
    pub peer_address: String,
    /// Peer autonomous system number.
    pub peer_asn: u32,
    /// Local autonomous system number.
    pub local_asn: u32,
}

// ---------------------------------------------------------------------------
// Report messages
// ---------------------------------------------------------------------------

/// Which stage of the pipeline a report message originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Fetch,
    Precompute,
    Compute,
}

/// Severity of a report message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A timestamped event streamed from the pipeline to the report observer.
///
/// Messages are ordered per sender; messages from concurrent senders may
/// interleave arbitrarily.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMessage {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Originating pipeline stage.
    pub kind: MessageKind,
    /// Severity of the event.
    pub severity: Severity,
    /// Human-readable description.
    pub text: String,
}

impl ReportMessage {
    /// Build a message stamped with the current time.
    pub fn new(kind: MessageKind, severity: Severity, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            severity,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Build stats & status
// ---------------------------------------------------------------------------

/// Aggregate timings and counts for one build cycle.
///
/// On a failed cycle only the fields reached before the failure are
/// meaningful; the rest stay at their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildStats {
    /// Time spent fetching assets from the source of truth.
    pub fetch_duration: Duration,
    /// Time spent building per-device models.
    pub precompute_duration: Duration,
    /// Time spent generating configuration artifacts.
    pub compute_duration: Duration,
    /// Total cycle time, measured from fetch start.
    pub total_duration: Duration,
    /// Number of devices whose artifact was successfully built.
    pub built_devices: u32,
}

/// Process-wide build state.
///
/// `Idle` is the initial state only; after the first cycle starts it is
/// never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Idle,
    InProgress,
    Success,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_id_roundtrip() {
        let id = CycleId::new();
        let s = id.to_string();
        let parsed: CycleId = s.parse().expect("parse CycleId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn device_record_deserializes() {
        let json = r#"{
            "hostname": "spine-01.dc1",
            "site": "dc1",
            "role": "spine",
            "platform": "eos",
            "management_address": "10.0.0.1"
        }"#;
        let rec: DeviceRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(rec.hostname, "spine-01.dc1");
        assert_eq!(rec.role, "spine");
    }

    #[test]
    fn interface_enabled_defaults_true() {
        let json = r#"{"device": "leaf-01", "name": "Ethernet1"}"#;
        let rec: InterfaceRecord = serde_json::from_str(json).expect("deserialize");
        assert!(rec.enabled);
        assert!(rec.address.is_none());
    }

    #[test]
    fn report_message_is_stamped() {
        let msg = ReportMessage::new(MessageKind::Compute, Severity::Warning, "skipped");
        assert_eq!(msg.kind, MessageKind::Compute);
        assert_eq!(msg.severity, Severity::Warning);
        assert!(msg.timestamp <= Utc::now());
    }

    #[test]
    fn build_stats_serialization() {
        let stats = BuildStats {
            fetch_duration: Duration::from_millis(120),
            precompute_duration: Duration::from_millis(30),
            compute_duration: Duration::from_millis(400),
            total_duration: Duration::from_millis(550),
            built_devices: 42,
        };
        let json = serde_json::to_string(&stats).expect("serialize");
        let parsed: BuildStats = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.built_devices, 42);
        assert_eq!(parsed.compute_duration, Duration::from_millis(400));
    }
}
