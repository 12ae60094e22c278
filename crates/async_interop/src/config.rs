//! Adapter configuration.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default name given to dedicated step threads when no Tokio runtime is available.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "async-interop-step";

/// Where a synchronous step is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OffloadMode {
    /// Run each step on the blocking pool (or a dedicated thread outside a runtime).
    #[default]
    Worker,
    /// Run each step on the calling task. Only suitable for cheap, non-blocking iterators.
    Inline,
}

impl fmt::Display for OffloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffloadMode::Worker => write!(f, "worker"),
            OffloadMode::Inline => write!(f, "inline"),
        }
    }
}

impl FromStr for OffloadMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "worker" | "offload" => Ok(OffloadMode::Worker),
            "inline" => Ok(OffloadMode::Inline),
            _ => Err(BridgeError::config(format!("unknown offload mode: {}", s))),
        }
    }
}

/// Configuration shared by the synchronous-to-asynchronous adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub offload: OffloadMode,
    pub worker_thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            offload: OffloadMode::Worker,
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Configuration that runs steps on the calling task.
    pub fn inline() -> Self {
        Self {
            offload: OffloadMode::Inline,
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> BridgeResult<Self> {
        let config: BridgeConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.worker_thread_name.trim().is_empty() {
            return Err(BridgeError::config("worker_thread_name must not be empty"));
        }
        // std::thread::Builder rejects names with interior NULs
        if self.worker_thread_name.contains('\0') {
            return Err(BridgeError::config(
                "worker_thread_name must not contain NUL bytes",
            ));
        }
        Ok(())
    }
}
