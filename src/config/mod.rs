use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::theme::parse_color;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Initial color, and the color derived before the hook is installed
    pub idle_color: String,

    /// Colors cycled through once the hook is installed
    pub palette: Vec<String>,

    /// Artificial latency inside install_hook()
    pub install_delay_ms: u64,

    /// Artificial latency inside derive_color()
    pub derive_delay_ms: u64,

    /// Input poll / redraw period
    pub tick_rate_ms: u64,

    /// Activity log length
    pub log_capacity: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            idle_color: "blue".to_string(),
            palette: ["green", "magenta", "yellow", "cyan", "red"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            install_delay_ms: 0,
            derive_delay_ms: 0,
            tick_rate_ms: 100,
            log_capacity: 8,
        }
    }
}

impl HarnessConfig {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("hookdemo");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from `path` (or the default location). A missing file is
    /// created with defaults; an unreadable one falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Ok(p) => p,
                Err(_) => return Ok(HarnessConfig::default()),
            },
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config {}: {}", path.display(), e),
                },
                Err(e) => tracing::warn!("Failed to read config {}: {}", path.display(), e),
            }
            return Ok(HarnessConfig::default());
        }

        let config = HarnessConfig::default();
        if let Err(e) = config.save(&path) {
            tracing::warn!("Could not write default config: {}", e);
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn idle_color(&self) -> Result<Color> {
        parse_color(&self.idle_color).context("config key `idle_color`")
    }

    pub fn palette(&self) -> Result<Vec<Color>> {
        self.palette
            .iter()
            .enumerate()
            .map(|(i, s)| parse_color(s).with_context(|| format!("config key `palette[{}]`", i)))
            .collect()
    }

    pub fn install_delay(&self) -> Duration {
        Duration::from_millis(self.install_delay_ms)
    }

    pub fn derive_delay(&self) -> Duration {
        Duration::from_millis(self.derive_delay_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        // Zero would spin the UI loop
        Duration::from_millis(self.tick_rate_ms.max(10))
    }
}
