//! The per-device build model.
//!
//! A [`DeviceModel`] is created during precompute from one inventory record
//! plus the shared context, owns its slice of the inventory for the rest of
//! the cycle, and renders its artifact during compute via
//! [`DeviceModel::generate_configs`].

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use configforge_inventory::PrecomputedContext;
use configforge_shared::{
    BgpSessionRecord, ConfigForgeError, DeviceRecord, InterfaceRecord, Result,
};

use crate::render::{self, DeviceConfig};

/// RFC 1123-style hostname labels, optionally dotted.
static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*$")
        .expect("hostname regex")
});

/// Per-device intermediate entity, exclusively owned during one cycle.
#[derive(Debug)]
pub struct DeviceModel {
    record: DeviceRecord,
    interfaces: Vec<InterfaceRecord>,
    sessions: Vec<BgpSessionRecord>,
    config: Option<DeviceConfig>,
}

impl DeviceModel {
    /// Build the model for one device, claiming its rows from the shared
    /// context. Validation failures here are precompute failures.
    pub fn new(record: DeviceRecord, ctx: &PrecomputedContext) -> Result<Self> {
        if !HOSTNAME_RE.is_match(&record.hostname) {
            return Err(ConfigForgeError::precompute_device(
                &record.hostname,
                "invalid hostname",
            ));
        }

        if record.role.is_empty() {
            return Err(ConfigForgeError::precompute_device(
                &record.hostname,
                "missing role",
            ));
        }

        if record.management_address.parse::<IpAddr>().is_err() {
            return Err(ConfigForgeError::precompute_device(
                &record.hostname,
                format!("invalid management address {}", record.management_address),
            ));
        }

        let interfaces = ctx.interfaces_for(&record.hostname).to_vec();
        if interfaces.is_empty() {
            return Err(ConfigForgeError::precompute_device(
                &record.hostname,
                "no interfaces in inventory",
            ));
        }

        let sessions = ctx.sessions_for(&record.hostname).to_vec();

        Ok(Self {
            record,
            interfaces,
            sessions,
            config: None,
        })
    }

    /// The device's unique hostname.
    pub fn hostname(&self) -> &str {
        &self.record.hostname
    }

    /// The rendered artifact, once [`generate_configs`](Self::generate_configs)
    /// has succeeded.
    pub fn config(&self) -> Option<&DeviceConfig> {
        self.config.as_ref()
    }

    /// Render this device's configuration artifact into the model.
    pub fn generate_configs(&mut self) -> Result<()> {
        let config = render::render(&self.record, &self.interfaces, &self.sessions)?;
        self.config = Some(config);
        Ok(())
    }
}
