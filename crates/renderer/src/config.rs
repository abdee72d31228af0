// sdbg - Simple Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration system for the sdbg renderer
//!
//! Settings live in `~/.sdbg.toml`. A missing file simply means defaults.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

/// Renderer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Pause before reading again after the user resumes, in milliseconds
    pub resume_delay_ms: u64,
    /// Pause after a successful snapshot save, in milliseconds
    pub save_delay_ms: u64,
    /// Pause after a failed snapshot save, in milliseconds
    pub save_error_delay_ms: u64,
    /// Clear the terminal before drawing each frame
    pub clear_screen: bool,
    /// Directory receiving saved snapshots (current directory when unset)
    pub save_dir: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            resume_delay_ms: 1000,
            save_delay_ms: 2000,
            save_error_delay_ms: 1500,
            clear_screen: true,
            save_dir: None,
        }
    }
}

impl RendererConfig {
    /// Get the config file path (~/.sdbg.toml)
    pub fn config_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| eyre::eyre!("Unable to determine home directory"))?;
        Ok(home.join(".sdbg.toml"))
    }

    /// Load configuration from the default path, using defaults if there is no file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            debug!("Config file not found at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        Self::load_from_path(config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;

        let config: Self =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Settle delay after resuming
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    /// Settle delay after a successful save
    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    /// Settle delay after a failed save
    pub fn save_error_delay(&self) -> Duration {
        Duration::from_millis(self.save_error_delay_ms)
    }

    /// Directory receiving saved snapshots
    pub fn save_dir(&self) -> PathBuf {
        self.save_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
