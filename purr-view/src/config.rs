//! Engine configuration loaded from JSON

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::interface::HistoryError;
use crate::viewport::MAX_QUICK_JUMP_DIGITS;

/// Top-level configuration. Every section and field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub viewport: ViewportConfig,

    #[serde(default)]
    pub quick_jump: QuickJumpConfig,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Row-height estimate and starting viewport size, in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_item_height")]
    pub item_height: f64,

    #[serde(default = "default_initial_height")]
    pub initial_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickJumpConfig {
    /// Clamped to 1..=9 on use
    #[serde(default = "default_max_digits")]
    pub max_digits: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Base directory for relative image paths such as `imgs/<name>.png`
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_stats_limit")]
    pub most_copied_limit: usize,

    #[serde(default = "default_stats_limit")]
    pub recent_apps_limit: usize,
}

// Default value functions
fn default_item_height() -> f64 {
    64.0
}

fn default_initial_height() -> f64 {
    480.0
}

fn default_max_digits() -> u8 {
    MAX_QUICK_JUMP_DIGITS
}

fn default_stats_limit() -> usize {
    10
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            item_height: default_item_height(),
            initial_height: default_initial_height(),
        }
    }
}

impl Default for QuickJumpConfig {
    fn default() -> Self {
        Self {
            max_digits: default_max_digits(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            most_copied_limit: default_stats_limit(),
            recent_apps_limit: default_stats_limit(),
        }
    }
}

impl QuickJumpConfig {
    pub fn effective_max_digits(&self) -> u8 {
        self.max_digits.clamp(1, MAX_QUICK_JUMP_DIGITS)
    }
}

impl EngineConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, HistoryError> {
        let config: Self = serde_json::from_str(content)?;
        if !(config.viewport.item_height.is_finite() && config.viewport.item_height > 0.0) {
            return Err(HistoryError::Config(format!(
                "viewport.item_height must be positive, got {}",
                config.viewport.item_height
            )));
        }
        Ok(config)
    }
}
