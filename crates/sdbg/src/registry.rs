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

//! Window identity allocation.
//!
//! A [`WindowRegistry`] hands out window identities in increasing order,
//! starting at zero, and opens windows with a shared configuration and
//! launcher. The process-wide registry behind [`new_window`] is created on
//! first use and lives until the process exits.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    OnceLock,
};

use sdbg_common::WindowId;
use tracing::info;

use crate::{RendererLauncher, TerminalLauncher, WindowConfig, WindowHandle};

static GLOBAL: OnceLock<WindowRegistry> = OnceLock::new();

/// Allocates window identities and opens windows.
pub struct WindowRegistry {
    next_id: AtomicU64,
    config: WindowConfig,
    launcher: Box<dyn RendererLauncher>,
}

impl std::fmt::Debug for WindowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRegistry")
            .field("next_id", &self.next_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WindowRegistry {
    /// Registry opening windows with `config` and starting renderers through `launcher`
    pub fn new(config: WindowConfig, launcher: impl RendererLauncher + 'static) -> Self {
        Self { next_id: AtomicU64::new(0), config, launcher: Box::new(launcher) }
    }

    /// Registry that starts each renderer in a terminal emulator
    pub fn with_terminal_launcher(config: WindowConfig) -> Self {
        Self::new(config, TerminalLauncher::new())
    }

    /// Configuration applied to every window
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Reserve the next window identity.
    ///
    /// Identities are never handed out twice, even when the window using one
    /// ends up disabled.
    pub fn allocate_id(&self) -> WindowId {
        WindowId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Number of identities handed out so far
    pub fn windows_opened(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Open a new debug window.
    ///
    /// Never fails: problems are reported as diagnostics and yield a disabled
    /// handle.
    pub fn open_window(&self) -> WindowHandle {
        let id = self.allocate_id();
        info!(window = %id, "Opening debug window");
        WindowHandle::create(id, &self.config, self.launcher.as_ref())
    }
}

/// Install `registry` as the process-wide registry.
///
/// Only possible before the first window is opened through [`new_window`] or
/// [`global`]; otherwise the rejected registry is handed back.
pub fn init_global(registry: WindowRegistry) -> Result<(), WindowRegistry> {
    GLOBAL.set(registry)
}

/// The process-wide registry, created from the environment on first use.
pub fn global() -> &'static WindowRegistry {
    GLOBAL.get_or_init(|| WindowRegistry::with_terminal_launcher(WindowConfig::from_env()))
}

/// Open a new debug window through the process-wide registry.
pub fn new_window() -> WindowHandle {
    global().open_window()
}
