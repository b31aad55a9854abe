//! Error types for configforge.
//!
//! Library crates use [`ConfigForgeError`] via `thiserror`.
//! The daemon binary wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all configforge operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Failure while fetching inventory from the source of truth.
    /// Always fatal to the build cycle.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A per-device model could not be built during precompute.
    #[error("device {hostname}: {message}")]
    PrecomputeDevice { hostname: String, message: String },

    /// Per-device precompute failures, folded into one stage-level error.
    /// Every individual cause is retained.
    #[error(transparent)]
    PrecomputeAggregate(#[from] AggregateError),

    /// The strict build policy rejected the cycle after precompute failures.
    #[error("failed: all devices must build")]
    AllDevicesMustBuild,

    /// A per-device artifact could not be rendered during compute.
    #[error("device {hostname}: {message}")]
    ComputeDevice { hostname: String, message: String },

    /// At least one compute task failed; the cycle is discarded.
    #[error("configuration generation failed")]
    ComputeFailed,

    /// Payload deserialization or data validation error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConfigForgeError>;

impl ConfigForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error from any displayable message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a per-device precompute error.
    pub fn precompute_device(hostname: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::PrecomputeDevice {
            hostname: hostname.into(),
            message: msg.into(),
        }
    }

    /// Create a per-device compute error.
    pub fn compute_device(hostname: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ComputeDevice {
            hostname: hostname.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// AggregateError
// ---------------------------------------------------------------------------

/// A stage-level error that keeps every individual cause.
///
/// Precompute can fail for many devices in one cycle; collapsing those into a
/// single message would lose the causes. This collects them all and renders a
/// joined, human-readable summary.
#[derive(Debug, Default)]
pub struct AggregateError {
    causes: Vec<ConfigForgeError>,
}

impl AggregateError {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record another cause.
    pub fn push(&mut self, cause: ConfigForgeError) {
        self.causes.push(cause);
    }

    /// True if no cause has been recorded.
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// Number of recorded causes.
    pub fn len(&self) -> usize {
        self.causes.len()
    }

    /// The individual causes, in the order they were recorded.
    pub fn causes(&self) -> &[ConfigForgeError] {
        &self.causes
    }

    /// Convert to `Err(self)` if any cause was recorded, `Ok(())` otherwise.
    pub fn into_result(self) -> std::result::Result<(), AggregateError> {
        if self.causes.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} device(s) failed: ", self.causes.len())?;
        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
