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

//! sdbg - Simple Debugger
//!
//! Instrument a running program with debug windows that show a live snapshot
//! of selected variables. Each window is rendered by a separate `sdbg-renderer`
//! process fed through a named pipe, so the instrumented program never blocks
//! and never fails because nobody is watching.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! let mut window = sdbg::new_window();
//! let mut counter = 0u32;
//! let label = "progress";
//! while window.update(&sdbg::vars!(counter, label), Duration::from_millis(5)) && counter < 100 {
//!     counter += 1;
//! }
//! ```

mod config;
mod inspect;
mod launcher;
mod registry;
mod window;

pub use config::WindowConfig;
pub use inspect::{short_type_name, Inspect, Variables};
pub use launcher::{LaunchError, RendererLauncher, TerminalKind, TerminalLauncher};
pub use registry::{global, init_global, new_window, WindowRegistry};
pub use window::{WindowHandle, WindowState};

pub use sdbg_common::{Snapshot, VariableEntry, WindowId};
