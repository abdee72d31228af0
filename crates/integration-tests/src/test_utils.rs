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

//! Test utilities for integration tests

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use sdbg::{LaunchError, RendererLauncher, Variables, WindowHandle};
use sdbg_common::{Channel, WindowId};
use sdbg_renderer::{drive, ChannelReader, Event, RendererConfig, Session, EVENT_QUEUE};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Default time a test waits for the renderer to catch up.
pub const WAIT: Duration = Duration::from_secs(10);

/// Initialization utilities for tests
pub mod init {
    /// Initialize logging for a test
    pub fn init_test_environment() {
        sdbg_common::logging::ensure_test_logging(None);
    }
}

/// A clonable in-memory display.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("display lock poisoned")).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("display lock poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Running {
    events: mpsc::Sender<Event>,
    thread: JoinHandle<eyre::Result<()>>,
}

/// Launcher running the renderer session on a background thread of this
/// process, drawing into a [`SharedBuffer`].
///
/// User input is injected with [`InProcessRenderer::send`].
pub struct InProcessRenderer {
    config: RendererConfig,
    display: SharedBuffer,
    running: Mutex<Option<Running>>,
}

impl InProcessRenderer {
    /// Renderer with no delays and no screen clearing
    pub fn new() -> Self {
        Self::with_config(RendererConfig {
            resume_delay_ms: 0,
            save_delay_ms: 0,
            save_error_delay_ms: 0,
            clear_screen: false,
            save_dir: None,
        })
    }

    /// Renderer using `config`
    pub fn with_config(config: RendererConfig) -> Self {
        Self { config, display: SharedBuffer::default(), running: Mutex::new(None) }
    }

    /// The renderer display
    pub fn display(&self) -> &SharedBuffer {
        &self.display
    }

    /// Whether a session was started
    pub fn launched(&self) -> bool {
        self.running.lock().expect("renderer lock poisoned").is_some()
    }

    /// Number of frames drawn so far
    pub fn frames_drawn(&self) -> usize {
        self.display.contents().matches(sdbg_renderer::format::TITLE).count()
    }

    /// Inject an event as if it came from the user
    pub fn send(&self, event: Event) {
        let events = self
            .running
            .lock()
            .expect("renderer lock poisoned")
            .as_ref()
            .map(|running| running.events.clone())
            .expect("renderer not launched");
        events.blocking_send(event).expect("renderer session gone");
    }

    /// Poll the display until it contains `needle`
    pub fn wait_for(&self, needle: &str, timeout: Duration) -> bool {
        wait_until(timeout, || self.display.contents().contains(needle))
    }

    /// Wait for the session to end and return its result
    pub fn join(&self) -> eyre::Result<()> {
        let running = self.running.lock().expect("renderer lock poisoned").take();
        match running {
            Some(running) => {
                drop(running.events);
                running.thread.join().map_err(|_| eyre::eyre!("renderer thread panicked"))?
            }
            None => Err(eyre::eyre!("renderer not launched")),
        }
    }
}

impl Default for InProcessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererLauncher for InProcessRenderer {
    fn launch(&self, id: WindowId, channel: &Channel) -> Result<(), LaunchError> {
        let (tx, mut rx) = mpsc::channel(EVENT_QUEUE);
        let reader = ChannelReader::spawn(channel.clone(), tx.clone())?;
        let mut session = Session::new(channel.clone(), self.display.clone(), self.config.clone())
            .with_reader(reader);

        let thread = thread::Builder::new().name(format!("sdbg-renderer-{id}")).spawn(
            move || -> eyre::Result<()> {
                let runtime =
                    tokio::runtime::Builder::new_current_thread().enable_time().build()?;
                runtime.block_on(drive(&mut session, &mut rx))
            },
        )?;

        info!(window = %id, "In-process renderer started");
        *self.running.lock().expect("renderer lock poisoned") = Some(Running { events: tx, thread });
        Ok(())
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Publish `vars` until the renderer has drawn one more frame.
///
/// Writes issued before the renderer attaches to the channel are dropped, so
/// a single update is not enough.
pub fn publish_until_drawn(
    window: &mut WindowHandle,
    renderer: &InProcessRenderer,
    vars: &Variables,
) -> bool {
    let before = renderer.frames_drawn();
    let mut attempts = 0;
    let drawn = wait_until(WAIT, || {
        attempts += 1;
        window.update(vars, Duration::from_millis(5));
        renderer.frames_drawn() > before
    });
    debug!(attempts, drawn, "Published frame");
    drawn
}
