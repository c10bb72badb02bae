//! # Player Configuration
//!
//! Host-level knobs of the player driver. Project-level settings live in the
//! document instead.

use crate::host::HostEnvironment;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable selecting the host environment.
pub const ENV_HOST: &str = "REEL_HOST";
/// Environment variable overriding the per-hook operation budget.
pub const ENV_MAX_SCRIPT_OPS: &str = "REEL_MAX_SCRIPT_OPS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Frame rates at or above this use the display-synchronized loop.
    pub uncapped_threshold_fps: f32,
    pub host: HostEnvironment,
    /// Operations one hook invocation may perform before it faults.
    pub max_script_operations: u64,
    /// Scale the canvas to the host window.
    pub fit_screen: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            uncapped_threshold_fps: 60.0,
            host: HostEnvironment::Desktop,
            max_script_operations: 100_000,
            fit_screen: true,
        }
    }
}

impl PlayerConfig {
    /// Defaults overlaid with `REEL_HOST` and `REEL_MAX_SCRIPT_OPS`.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`. Unparsable values are logged and ignored.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(ENV_HOST) {
            match value.parse() {
                Ok(host) => self.host = host,
                Err(e) => warn!("ignoring {}: {}", ENV_HOST, e),
            }
        }
        if let Some(value) = lookup(ENV_MAX_SCRIPT_OPS) {
            match value.trim().parse::<u64>() {
                Ok(ops) if ops > 0 => self.max_script_operations = ops,
                _ => warn!("ignoring {}: '{}' is not a positive integer", ENV_MAX_SCRIPT_OPS, value),
            }
        }
        self
    }
}
