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

//! Producer-side debug window.

use std::{
    thread,
    time::{Duration, Instant},
};

use sdbg_common::{codec, sd_error, Channel, DropReason, Snapshot, WindowId, WriteOutcome};
use tracing::{debug, trace, warn};

use crate::{RendererLauncher, Variables, WindowConfig};

/// Lifecycle state of a [`WindowHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// The channel exists and a renderer was started for it
    Live,
    /// Creation failed, every call is a no-op from now on
    Disabled,
}

/// One debug window as seen by the instrumented program.
///
/// A handle never reports failure to its caller. If the channel cannot be
/// created or the renderer cannot be started the handle turns permanently
/// [`WindowState::Disabled`] and keeps accepting `update` calls as no-ops.
///
/// `update` takes `&mut self`: writes on one window must not interleave.
#[derive(Debug)]
pub struct WindowHandle {
    id: WindowId,
    channel: Channel,
    state: WindowState,
    min_spacing: Duration,
    last_write: Option<Instant>,
}

impl WindowHandle {
    /// Create the channel for window `id` and start its renderer.
    pub fn create(id: WindowId, config: &WindowConfig, launcher: &dyn RendererLauncher) -> Self {
        let channel = Channel::for_window(&config.channel_dir, id);
        let mut handle = Self {
            id,
            channel,
            state: WindowState::Disabled,
            min_spacing: config.min_spacing,
            last_write: None,
        };

        if let Err(e) = handle.channel.ensure() {
            sd_error!("Could not create FIFO for window {}, ignoring all calls! ({})", id, e);
            return handle;
        }

        if let Err(e) = launcher.launch(id, &handle.channel) {
            if let Err(remove_err) = handle.channel.remove() {
                warn!(window = %id, error = %remove_err, "Could not remove channel after failed launch");
            }
            sd_error!(
                "debugger window {} subprocess not started, ignoring all calls! ({})",
                id,
                e
            );
            return handle;
        }

        debug!(window = %id, path = %handle.channel.path().display(), "Debug window created");
        handle.state = WindowState::Live;
        handle
    }

    /// Identity of this window
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Channel backing this window
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Current lifecycle state
    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Whether this window ignores all calls
    pub fn is_disabled(&self) -> bool {
        self.state == WindowState::Disabled
    }

    /// Send a snapshot of `vars` to the renderer.
    ///
    /// Always returns `true` so it can sit in a loop condition. The frame is
    /// silently dropped when no renderer is reading. A non-zero `delay` sleeps
    /// after the write, for call sites that update in a tight loop.
    pub fn update(&mut self, vars: &Variables, delay: Duration) -> bool {
        if self.is_disabled() {
            return true;
        }
        self.send(&vars.snapshot(), delay);
        true
    }

    /// Send an already built snapshot, see [`WindowHandle::update`].
    pub fn update_snapshot(&mut self, snapshot: &Snapshot, delay: Duration) -> bool {
        if self.is_disabled() {
            return true;
        }
        self.send(snapshot, delay);
        true
    }

    fn send(&mut self, snapshot: &Snapshot, delay: Duration) {
        self.wait_for_spacing();

        let payload = match codec::encode(snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(window = %self.id, error = %e, "Snapshot cannot be encoded, frame dropped");
                return;
            }
        };
        match self.channel.try_write(&payload, delay) {
            Ok(WriteOutcome::Delivered) => {
                trace!(window = %self.id, bytes = payload.len(), "Frame delivered");
            }
            Ok(WriteOutcome::Dropped(DropReason::NoReader)) => {
                trace!(window = %self.id, "Frame dropped, no renderer attached");
            }
            Ok(WriteOutcome::Dropped(DropReason::Missing)) => {
                debug!(window = %self.id, "Frame dropped, channel is gone");
            }
            Err(e) => {
                warn!(window = %self.id, error = %e, "Unexpected channel error, frame dropped");
            }
        }

        self.last_write = Some(Instant::now());
    }

    fn wait_for_spacing(&self) {
        if self.min_spacing.is_zero() {
            return;
        }
        if let Some(last) = self.last_write {
            let elapsed = last.elapsed();
            if elapsed < self.min_spacing {
                thread::sleep(self.min_spacing - elapsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LaunchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok_launcher(_: WindowId, _: &Channel) -> Result<(), LaunchError> {
        Ok(())
    }

    fn failing_launcher(_: WindowId, _: &Channel) -> Result<(), LaunchError> {
        Err(LaunchError::NoTerminal)
    }

    #[test]
    fn test_create_makes_channel_and_launches() {
        let dir = tempfile::tempdir().unwrap();
        let config = WindowConfig::default().with_channel_dir(dir.path());
        let launches = AtomicUsize::new(0);
        let launcher = |id: WindowId, channel: &Channel| -> Result<(), LaunchError> {
            assert_eq!(id, WindowId::new(7));
            assert!(channel.exists());
            launches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let handle = WindowHandle::create(WindowId::new(7), &config, &launcher);
        assert_eq!(handle.state(), WindowState::Live);
        assert_eq!(handle.channel().path(), dir.path().join("simpleDebugger7.pipe"));
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_create_failure_disables_window() {
        let dir = tempfile::tempdir().unwrap();
        let config = WindowConfig::default().with_channel_dir(dir.path().join("missing"));

        let mut handle = WindowHandle::create(WindowId::new(0), &config, &ok_launcher);
        assert!(handle.is_disabled());

        let vars = Variables::new().with("x", &1);
        for _ in 0..10 {
            assert!(handle.update(&vars, Duration::ZERO));
        }
        assert!(!dir.path().join("missing").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_launch_failure_removes_channel_and_disables() {
        let dir = tempfile::tempdir().unwrap();
        let config = WindowConfig::default().with_channel_dir(dir.path());

        let mut handle = WindowHandle::create(WindowId::new(1), &config, &failing_launcher);
        assert!(handle.is_disabled());
        assert!(!handle.channel().exists());

        // A disabled window must not honour the delay either
        let start = Instant::now();
        assert!(handle.update(&Variables::new(), Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_update_without_reader_returns_true() {
        let dir = tempfile::tempdir().unwrap();
        let config = WindowConfig::default().with_channel_dir(dir.path());
        let mut handle = WindowHandle::create(WindowId::new(2), &config, &ok_launcher);

        let vars = Variables::new().with("x", &1).with("y", &2.5);
        assert!(handle.update(&vars, Duration::ZERO));
        assert!(handle.update_snapshot(&vars.snapshot(), Duration::ZERO));
    }

    #[test]
    fn test_update_survives_vanished_channel() {
        let dir = tempfile::tempdir().unwrap();
        let config = WindowConfig::default().with_channel_dir(dir.path());
        let mut handle = WindowHandle::create(WindowId::new(3), &config, &ok_launcher);

        handle.channel().remove().unwrap();
        assert!(handle.update(&Variables::new().with("x", &1), Duration::ZERO));
        assert!(!handle.channel().exists());
    }

    #[test]
    fn test_min_spacing_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let config = WindowConfig::default()
            .with_channel_dir(dir.path())
            .with_min_spacing(Duration::from_millis(20));
        let mut handle = WindowHandle::create(WindowId::new(4), &config, &ok_launcher);

        let vars = Variables::new().with("x", &1);
        let start = Instant::now();
        for _ in 0..3 {
            handle.update(&vars, Duration::ZERO);
        }
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
