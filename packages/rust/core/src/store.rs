//! Last-known-good artifact store: the seam between the build engine and
//! the serving layer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use configforge_device::DeviceModel;

/// The immutable published snapshot: hostname → built device.
pub type ArtifactSet = Arc<HashMap<String, Arc<DeviceModel>>>;

/// Process-wide holder of the most recent successfully built artifact set.
///
/// The supervisor replaces the whole snapshot in one step after a fully
/// successful cycle; serving consumers read concurrently and always see a
/// complete, consistent set. A failed cycle leaves the previous snapshot in
/// place — stale data is preferred over none.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<RwLock<ArtifactSet>>,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(HashMap::new()))),
        }
    }

    /// Atomically replace the published set.
    pub async fn set(&self, artifacts: ArtifactSet) {
        *self.inner.write().await = artifacts;
    }

    /// The current snapshot. Cheap — hands out the Arc.
    pub async fn get(&self) -> ArtifactSet {
        self.inner.read().await.clone()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_empty() {
        let store = ConfigStore::new();
        assert!(store.get().await.is_empty());
    }

    #[tokio::test]
    async fn set_replaces_whole_snapshot() {
        let store = ConfigStore::new();

        let before = store.get().await;

        let mut map = HashMap::new();
        map.insert("leaf-01".to_string(), test_model("leaf-01"));
        store.set(Arc::new(map)).await;

        let after = store.get().await;
        assert_eq!(after.len(), 1);
        assert!(after.contains_key("leaf-01"));

        // The old snapshot is untouched — readers holding it keep a
        // consistent view.
        assert!(before.is_empty());
    }

    fn test_model(hostname: &str) -> Arc<DeviceModel> {
        use chrono::Utc;
        use configforge_inventory::Assets;
        use configforge_shared::{DeviceRecord, InterfaceRecord};

        let assets = Assets {
            devices: vec![],
            interfaces: vec![InterfaceRecord {
                device: hostname.into(),
                name: "Ethernet1".into(),
                description: None,
                address: None,
                enabled: true,
            }],
            bgp_sessions: vec![],
            fetched_at: Utc::now(),
        };
        let ctx = assets.precompute();
        let record = DeviceRecord {
            hostname: hostname.into(),
            site: "dc1".into(),
            role: "leaf".into(),
            platform: "eos".into(),
            management_address: "10.0.0.1".into(),
        };
        Arc::new(DeviceModel::new(record, &ctx).expect("model"))
    }
}
