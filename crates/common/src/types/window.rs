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

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Identity of a debug window, unique for the lifetime of the producer process.
///
/// Identities are handed out in increasing order starting at zero and are only
/// used to derive the path of the window's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Wrap a raw window number.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw window number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// File name of the channel backing this window, e.g. `simpleDebugger0.pipe`.
    pub fn channel_file_name(self) -> String {
        format!("simpleDebugger{}.pipe", self.0)
    }

    /// Full channel path for this window inside `dir`.
    pub fn channel_path(self, dir: &Path) -> PathBuf {
        dir.join(self.channel_file_name())
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WindowId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
