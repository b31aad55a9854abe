//! Asset sources: where the inventory comes from.
//!
//! [`HttpAssetSource`] pulls JSON collections from a CMDB-style API.
//! [`StaticAssetSource`] serves a fixed inventory for tests and dry runs.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use configforge_report::ReportSender;
use configforge_shared::{
    BgpSessionRecord, ConfigForgeError, DeviceRecord, InterfaceRecord, MessageKind, Result,
    SourceConfig,
};

use crate::assets::Assets;

/// User-Agent string for source-of-truth requests.
const USER_AGENT: &str = concat!("configforge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// AssetSource
// ---------------------------------------------------------------------------

/// Supplier of raw inventory for one build cycle.
///
/// A fetch error is fatal to the cycle; partial inventories are never
/// returned.
pub trait AssetSource: Send + Sync {
    /// Fetch the full inventory, emitting progress into the report channel.
    fn fetch_assets(
        &self,
        report: &ReportSender,
    ) -> impl Future<Output = Result<Assets>> + Send;
}

// ---------------------------------------------------------------------------
// HttpAssetSource
// ---------------------------------------------------------------------------

/// Inventory source backed by a CMDB-style HTTP API.
///
/// Expects three JSON collections under the configured base URL:
/// `devices`, `interfaces`, and `bgp-sessions`.
pub struct HttpAssetSource {
    base_url: Url,
    client: Client,
    token: Option<String>,
}

impl HttpAssetSource {
    /// Build a source from the `[source]` config section. The API token is
    /// read from the env var named there, if set.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigForgeError::config(format!("invalid source base_url: {e}")))?;
        // Url::join drops the last path segment without this.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigForgeError::fetch(format!("failed to build HTTP client: {e}")))?;

        let token = std::env::var(&config.token_env).ok().filter(|t| !t.is_empty());

        Ok(Self {
            base_url,
            client,
            token,
        })
    }

    /// Fetch and deserialize one collection endpoint.
    async fn fetch_collection<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ConfigForgeError::fetch(format!("{path}: {e}")))?;

        debug!(%url, "fetching collection");

        let mut request = self.client.get(url.as_str());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConfigForgeError::fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigForgeError::fetch(format!("{url}: HTTP {status}")));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| ConfigForgeError::fetch(format!("{url}: invalid payload: {e}")))
    }
}

impl AssetSource for HttpAssetSource {
    fn fetch_assets(
        &self,
        report: &ReportSender,
    ) -> impl Future<Output = Result<Assets>> + Send {
        async move {
            let devices: Vec<DeviceRecord> = self.fetch_collection("devices").await?;
            report
                .info(MessageKind::Fetch, format!("devices: {} rows", devices.len()))
                .await;

            let interfaces: Vec<InterfaceRecord> = self.fetch_collection("interfaces").await?;
            report
                .info(
                    MessageKind::Fetch,
                    format!("interfaces: {} rows", interfaces.len()),
                )
                .await;

            let bgp_sessions: Vec<BgpSessionRecord> =
                self.fetch_collection("bgp-sessions").await?;
            report
                .info(
                    MessageKind::Fetch,
                    format!("bgp-sessions: {} rows", bgp_sessions.len()),
                )
                .await;

            let assets = Assets {
                devices,
                interfaces,
                bgp_sessions,
                fetched_at: Utc::now(),
            };

            // Rows pointing at unknown devices are kept (precompute ignores
            // them) but flagged, since they usually mean a stale export.
            let known: std::collections::HashSet<&str> =
                assets.devices.iter().map(|d| d.hostname.as_str()).collect();
            let orphans = assets
                .interfaces
                .iter()
                .map(|i| i.device.as_str())
                .chain(assets.bgp_sessions.iter().map(|s| s.device.as_str()))
                .filter(|d| !known.contains(d))
                .count();
            if orphans > 0 {
                warn!(orphans, "inventory rows reference unknown devices");
                report
                    .warning(
                        MessageKind::Fetch,
                        format!("{orphans} rows reference devices not in the inventory"),
                    )
                    .await;
            }

            Ok(assets)
        }
    }
}

// ---------------------------------------------------------------------------
// StaticAssetSource
// ---------------------------------------------------------------------------

/// Fixed in-memory inventory, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct StaticAssetSource {
    /// Device rows to serve.
    pub devices: Vec<DeviceRecord>,
    /// Interface rows to serve.
    pub interfaces: Vec<InterfaceRecord>,
    /// BGP session rows to serve.
    pub bgp_sessions: Vec<BgpSessionRecord>,
}

impl AssetSource for StaticAssetSource {
    fn fetch_assets(
        &self,
        _report: &ReportSender,
    ) -> impl Future<Output = Result<Assets>> + Send {
        async move {
            Ok(Assets {
                devices: self.devices.clone(),
                interfaces: self.interfaces.clone(),
                bgp_sessions: self.bgp_sessions.clone(),
                fetched_at: Utc::now(),
            })
        }
    }
}
