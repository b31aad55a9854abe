//! Live build report store.
//!
//! Each build cycle produces a stream of [`ReportMessage`]s over a bounded
//! channel. The store's [`ReportStore::watch`] loop drains that channel into
//! the current report while the pipeline runs, and the supervisor drives the
//! report lifecycle (start, status updates, stats, completion).
//!
//! The report's query surface (HTTP or otherwise) is out of scope here;
//! [`ReportStore::snapshot`] is the seam it would read from.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use configforge_shared::{BuildStats, BuildStatus, CycleId, MessageKind, ReportMessage, Severity};

// ---------------------------------------------------------------------------
// ReportSender
// ---------------------------------------------------------------------------

/// Sending half of the per-cycle report channel.
///
/// Cheap to clone; every pipeline stage and compute task holds one. Sends
/// into a closed channel are dropped silently — report loss must never take
/// the pipeline down with it.
#[derive(Clone)]
pub struct ReportSender {
    tx: mpsc::Sender<ReportMessage>,
}

impl ReportSender {
    /// Wrap the sending half of a report channel.
    pub fn new(tx: mpsc::Sender<ReportMessage>) -> Self {
        Self { tx }
    }

    /// Send a prebuilt message. Blocks if the channel is full.
    pub async fn send(&self, message: ReportMessage) {
        if self.tx.send(message).await.is_err() {
            debug!("report channel closed, message dropped");
        }
    }

    /// Emit an Info message for the given stage.
    pub async fn info(&self, kind: MessageKind, text: impl Into<String>) {
        self.send(ReportMessage::new(kind, Severity::Info, text)).await;
    }

    /// Emit a Warning message for the given stage.
    pub async fn warning(&self, kind: MessageKind, text: impl Into<String>) {
        self.send(ReportMessage::new(kind, Severity::Warning, text))
            .await;
    }

    /// Emit an Error message for the given stage.
    pub async fn error(&self, kind: MessageKind, text: impl Into<String>) {
        self.send(ReportMessage::new(kind, Severity::Error, text))
            .await;
    }
}

// ---------------------------------------------------------------------------
// BuildReport
// ---------------------------------------------------------------------------

/// The state of the current (or most recently finished) build cycle.
///
/// Reset at cycle start, finalized at cycle end, retained until superseded
/// by the next cycle.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Identifier of the cycle this report covers.
    pub cycle_id: CycleId,
    /// Current build state.
    pub status: BuildStatus,
    /// Accumulated messages for this cycle, in arrival order.
    pub messages: Vec<ReportMessage>,
    /// Stats for this cycle, set once the pipeline returns.
    pub stats: Option<BuildStats>,
    /// When the last fully successful cycle finished (kept across cycles).
    pub last_successful_at: Option<DateTime<Utc>>,
    /// When this cycle was marked complete.
    pub completed_at: Option<DateTime<Utc>>,
}

impl BuildReport {
    fn idle() -> Self {
        Self {
            cycle_id: CycleId::new(),
            status: BuildStatus::Idle,
            messages: Vec::new(),
            stats: None,
            last_successful_at: None,
            completed_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ReportStore
// ---------------------------------------------------------------------------

/// Clone-shared handle to the process-wide build report.
#[derive(Clone)]
pub struct ReportStore {
    inner: Arc<RwLock<BuildReport>>,
}

impl ReportStore {
    /// Create a store in the initial `Idle` state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BuildReport::idle())),
        }
    }

    /// Begin a new cycle: fresh cycle id, cleared history and stats.
    /// The last-successful timestamp survives the reset.
    pub async fn start_new_report(&self) {
        let mut report = self.inner.write().await;
        report.cycle_id = CycleId::new();
        report.messages.clear();
        report.stats = None;
        report.completed_at = None;
    }

    /// Drain messages from `rx` into the current report until the channel
    /// closes. Runs as the per-cycle observer task.
    pub async fn watch(&self, mut rx: mpsc::Receiver<ReportMessage>) {
        while let Some(message) = rx.recv().await {
            self.inner.write().await.messages.push(message);
        }
    }

    /// Set the current build status.
    pub async fn update_status(&self, status: BuildStatus) {
        self.inner.write().await.status = status;
    }

    /// Record the cycle's stats.
    pub async fn update_stats(&self, stats: BuildStats) {
        self.inner.write().await.stats = Some(stats);
    }

    /// Record the last-known-good timestamp for a successful cycle.
    pub async fn mark_as_successful(&self) {
        self.inner.write().await.last_successful_at = Some(Utc::now());
    }

    /// Mark the cycle finished, success or not.
    pub async fn mark_as_complete(&self) {
        self.inner.write().await.completed_at = Some(Utc::now());
    }

    /// A consistent copy of the current report.
    pub async fn snapshot(&self) -> BuildReport {
        self.inner.read().await.clone()
    }
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}
