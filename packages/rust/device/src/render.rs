//! OpenConfig-style artifact rendering for one device.

use std::collections::HashSet;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use configforge_shared::{
    BgpSessionRecord, ConfigForgeError, DeviceRecord, InterfaceRecord, Result,
};

// ---------------------------------------------------------------------------
// Rendered artifact
// ---------------------------------------------------------------------------

/// The generated per-device configuration artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device hostname.
    pub hostname: String,
    /// When this artifact was rendered.
    pub generated_at: DateTime<Utc>,
    /// Interface configuration section.
    pub interfaces: Vec<InterfaceConfig>,
    /// BGP configuration section, absent when the device has no sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgp: Option<BgpConfig>,
    /// SHA-256 over the rendered sections, for change detection downstream.
    pub content_hash: String,
}

/// One rendered interface stanza.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Interface name.
    pub name: String,
    /// Description line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Address in CIDR notation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Administrative state.
    pub enabled: bool,
}

/// The rendered BGP section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BgpConfig {
    /// Local autonomous system number.
    pub local_asn: u32,
    /// Configured neighbors.
    pub neighbors: Vec<BgpNeighborConfig>,
}

/// One rendered BGP neighbor stanza.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BgpNeighborConfig {
    /// Peer address.
    pub peer_address: String,
    /// Peer autonomous system number.
    pub peer_asn: u32,
    /// Local address the session binds to.
    pub local_address: String,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the artifact for one device from its claimed inventory slice.
pub(crate) fn render(
    record: &DeviceRecord,
    interfaces: &[InterfaceRecord],
    sessions: &[BgpSessionRecord],
) -> Result<DeviceConfig> {
    let hostname = &record.hostname;

    // Interface section. Duplicate names mean a corrupt inventory export.
    let mut seen: HashSet<&str> = HashSet::new();
    let mut rendered_interfaces = Vec::with_capacity(interfaces.len());
    let mut local_addresses: HashSet<IpAddr> = HashSet::new();

    for iface in interfaces {
        if !seen.insert(iface.name.as_str()) {
            return Err(ConfigForgeError::compute_device(
                hostname,
                format!("duplicate interface {}", iface.name),
            ));
        }

        if let Some(address) = &iface.address {
            let ip = parse_cidr(address).ok_or_else(|| {
                ConfigForgeError::compute_device(
                    hostname,
                    format!("interface {}: invalid address {address}", iface.name),
                )
            })?;
            local_addresses.insert(ip);
        }

        rendered_interfaces.push(InterfaceConfig {
            name: iface.name.clone(),
            description: iface.description.clone(),
            address: iface.address.clone(),
            enabled: iface.enabled,
        });
    }

    // BGP section. Every session must bind to an address this device owns.
    let bgp = if sessions.is_empty() {
        None
    } else {
        let local_asn = sessions[0].local_asn;
        let mut neighbors = Vec::with_capacity(sessions.len());

        for session in sessions {
            if session.local_asn != local_asn {
                return Err(ConfigForgeError::compute_device(
                    hostname,
                    format!(
                        "conflicting local ASNs {} and {}",
                        local_asn, session.local_asn
                    ),
                ));
            }

            let local: IpAddr = session.local_address.parse().map_err(|_| {
                ConfigForgeError::compute_device(
                    hostname,
                    format!("invalid session local address {}", session.local_address),
                )
            })?;
            if !local_addresses.contains(&local) {
                return Err(ConfigForgeError::compute_device(
                    hostname,
                    format!(
                        "session to {} binds {} which no interface carries",
                        session.peer_address, session.local_address
                    ),
                ));
            }

            neighbors.push(BgpNeighborConfig {
                peer_address: session.peer_address.clone(),
                peer_asn: session.peer_asn,
                local_address: session.local_address.clone(),
            });
        }

        Some(BgpConfig {
            local_asn,
            neighbors,
        })
    };

    let content_hash = hash_sections(hostname, &rendered_interfaces, &bgp)?;

    Ok(DeviceConfig {
        hostname: hostname.clone(),
        generated_at: Utc::now(),
        interfaces: rendered_interfaces,
        bgp,
        content_hash,
    })
}

/// Hash the rendered sections (not the timestamp) so identical inventory
/// yields an identical hash across cycles.
fn hash_sections(
    hostname: &str,
    interfaces: &[InterfaceConfig],
    bgp: &Option<BgpConfig>,
) -> Result<String> {
    #[derive(Serialize)]
    struct Hashable<'a> {
        hostname: &'a str,
        interfaces: &'a [InterfaceConfig],
        bgp: &'a Option<BgpConfig>,
    }

    let payload = serde_json::to_vec(&Hashable {
        hostname,
        interfaces,
        bgp,
    })
    .map_err(|e| ConfigForgeError::compute_device(hostname, format!("serialization: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Parse `a.b.c.d/len` (or the v6 equivalent), returning the address part.
fn parse_cidr(s: &str) -> Option<IpAddr> {
    let (addr, prefix) = s.split_once('/')?;
    let ip: IpAddr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    let max = match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    (prefix <= max).then_some(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hostname: &str) -> DeviceRecord {
        DeviceRecord {
            hostname: hostname.into(),
            site: "dc1".into(),
            role: "leaf".into(),
            platform: "eos".into(),
            management_address: "10.0.0.1".into(),
        }
    }

    fn iface(name: &str, address: Option<&str>) -> InterfaceRecord {
        InterfaceRecord {
            device: "leaf-01".into(),
            name: name.into(),
            description: None,
            address: address.map(Into::into),
            enabled: true,
        }
    }

    #[test]
    fn parse_cidr_accepts_valid() {
        assert!(parse_cidr("192.0.2.1/31").is_some());
        assert!(parse_cidr("2001:db8::1/64").is_some());
    }

    #[test]
    fn parse_cidr_rejects_invalid() {
        assert!(parse_cidr("192.0.2.1").is_none());
        assert!(parse_cidr("192.0.2.1/33").is_none());
        assert!(parse_cidr("not-an-ip/24").is_none());
    }

    #[test]
    fn render_basic_device() {
        let config = render(
            &record("leaf-01"),
            &[iface("Ethernet1", Some("192.0.2.1/31"))],
            &[],
        )
        .expect("render");

        assert_eq!(config.hostname, "leaf-01");
        assert_eq!(config.interfaces.len(), 1);
        assert!(config.bgp.is_none());
        assert_eq!(config.content_hash.len(), 64);
    }

    #[test]
    fn render_rejects_duplicate_interfaces() {
        let err = render(
            &record("leaf-01"),
            &[iface("Ethernet1", None), iface("Ethernet1", None)],
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate interface"));
    }

    #[test]
    fn render_rejects_unbound_session() {
        let session = BgpSessionRecord {
            device: "leaf-01".into(),
            local_address: "198.51.100.9".into(),
            peer_address: "198.51.100.8".into(),
            peer_asn: 65001,
            local_asn: 65000,
        };
        let err = render(
            &record("leaf-01"),
            &[iface("Ethernet1", Some("192.0.2.1/31"))],
            &[session],
        )
        .unwrap_err();
        assert!(err.to_string().contains("no interface carries"));
    }

    #[test]
    fn render_bgp_session_bound_to_interface() {
        let session = BgpSessionRecord {
            device: "leaf-01".into(),
            local_address: "192.0.2.1".into(),
            peer_address: "192.0.2.0".into(),
            peer_asn: 65001,
            local_asn: 65000,
        };
        let config = render(
            &record("leaf-01"),
            &[iface("Ethernet1", Some("192.0.2.1/31"))],
            &[session],
        )
        .expect("render");

        let bgp = config.bgp.expect("bgp section");
        assert_eq!(bgp.local_asn, 65000);
        assert_eq!(bgp.neighbors.len(), 1);
        assert_eq!(bgp.neighbors[0].peer_asn, 65001);
    }

    #[test]
    fn content_hash_stable_across_renders() {
        let interfaces = [iface("Ethernet1", Some("192.0.2.1/31"))];
        let a = render(&record("leaf-01"), &interfaces, &[]).expect("render");
        let b = render(&record("leaf-01"), &interfaces, &[]).expect("render");
        assert_eq!(a.content_hash, b.content_hash);
    }
}
