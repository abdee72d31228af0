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

//! Environment variable name constants for sdbg configuration.
//!
//! # Environment Variables
//!
//! ## Producer
//! - [`SDBG_CHANNEL_DIR`] - Directory holding the window channels
//! - [`SDBG_MIN_SPACING_MS`] - Minimum spacing enforced between writes
//! - [`SDBG_RENDERER`] - Renderer executable started for each window
//!
//! ## Renderer
//! - [`SDBG_CHANNEL_DIR`] - Must match the producer's channel directory

use std::{env, path::PathBuf};

/// Environment variable for the directory that holds window channels.
///
/// Both the producer and the renderer resolve channel paths relative to this
/// directory. The terminal launcher forwards the producer's value to every
/// renderer it starts.
///
/// # Default
///
/// When not set, the system temporary directory is used.
pub const SDBG_CHANNEL_DIR: &str = "SDBG_CHANNEL_DIR";

/// Environment variable for the minimum spacing between two writes on one
/// window, in milliseconds.
///
/// Named pipes need the open/write/close cycle of both sides to complete before
/// the next write can be observed. Writes issued closer together than roughly
/// 2-3 ms can be dropped even with a renderer attached.
///
/// # Default
///
/// `0`: no spacing is enforced and bursty callers are expected to pass an
/// explicit delay to `update`.
pub const SDBG_MIN_SPACING_MS: &str = "SDBG_MIN_SPACING_MS";

/// Environment variable naming the renderer executable.
///
/// # Default
///
/// `sdbg-renderer` next to the current executable, else on `PATH`.
pub const SDBG_RENDERER: &str = "SDBG_RENDERER";

/// Resolve the channel directory from [`SDBG_CHANNEL_DIR`], falling back to the
/// system temporary directory.
pub fn channel_dir() -> PathBuf {
    env::var_os(SDBG_CHANNEL_DIR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir)
}
