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

//! Producer-side configuration.

use std::{env, path::PathBuf, time::Duration};

use sdbg_common::env::{self as sdbg_env, SDBG_MIN_SPACING_MS};
use tracing::warn;

/// Settings shared by every window a registry opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Directory holding the window channels
    pub channel_dir: PathBuf,
    /// Minimum time between two writes on the same window.
    ///
    /// Pipe writes that follow each other within roughly 2-3 ms may be lost even
    /// with a renderer attached. Zero leaves spacing to the caller.
    pub min_spacing: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { channel_dir: env::temp_dir(), min_spacing: Duration::ZERO }
    }
}

impl WindowConfig {
    /// Read the configuration from `SDBG_CHANNEL_DIR` and `SDBG_MIN_SPACING_MS`.
    ///
    /// Unparsable values fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        let min_spacing = match env::var(SDBG_MIN_SPACING_MS) {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(e) => {
                    warn!("Ignoring invalid {}={:?}: {}", SDBG_MIN_SPACING_MS, raw, e);
                    Duration::ZERO
                }
            },
            Err(_) => Duration::ZERO,
        };

        Self { channel_dir: sdbg_env::channel_dir(), min_spacing }
    }

    /// Use a different channel directory
    pub fn with_channel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.channel_dir = dir.into();
        self
    }

    /// Enforce a minimum spacing between writes
    pub fn with_min_spacing(mut self, spacing: Duration) -> Self {
        self.min_spacing = spacing;
        self
    }
}
