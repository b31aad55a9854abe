//! Shared types, error model, and configuration for configforge.
//!
//! This crate is the foundation depended on by all other configforge crates.
//! It provides:
//! - [`ConfigForgeError`] — the unified error type
//! - Domain types ([`DeviceRecord`], [`ReportMessage`], [`BuildStats`], [`CycleId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, SourceConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{AggregateError, ConfigForgeError, Result};
pub use types::{
    BgpSessionRecord, BuildStats, BuildStatus, CycleId, DeviceRecord, InterfaceRecord,
    MessageKind, ReportMessage, Severity,
};
