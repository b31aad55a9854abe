//! Build orchestration engine for configforge.
//!
//! Ties inventory fetching, per-device model precompute, and concurrent
//! artifact generation into one pipeline ([`run_build`]), and runs that
//! pipeline indefinitely under the [`BuildSupervisor`].

mod compute;
mod metrics;
mod pipeline;
mod precompute;
mod store;
mod supervisor;

pub use compute::compute;
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use pipeline::run_build;
pub use precompute::{ModelMap, precompute};
pub use store::{ArtifactSet, ConfigStore};
pub use supervisor::BuildSupervisor;
