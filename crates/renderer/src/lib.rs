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

//! # sdbg-renderer
//!
//! Draws the snapshots published by an sdbg window.
//!
//! A renderer is bound to one window. It blocks on the window's channel,
//! decodes every payload into a table of variables and redraws the screen.
//! Ctrl-C pauses the display and offers to resume, save the current frame or
//! exit; exiting removes the channel so the producer stops publishing.

use std::path::Path;

use eyre::Result;
use sdbg_common::{Channel, WindowId};
use tokio::sync::mpsc::{self, Receiver};
use tracing::{debug, info};

pub mod config;
pub mod format;
pub mod reader;
pub mod save;
pub mod session;

pub use config::RendererConfig;
pub use reader::{spawn_pause_listener, spawn_stdin_reader, ChannelReader};
pub use save::{save_frame, snapshot_file_name, SaveError};
pub use session::{Event, Flow, Session, SessionState};

/// Capacity of the session event queue.
pub const EVENT_QUEUE: usize = 32;

/// Feed events from `rx` into `session` until it exits.
///
/// Returns `Ok` once the session exits normally, or when every event source is
/// gone.
pub async fn drive<W: std::io::Write>(
    session: &mut Session<W>,
    rx: &mut Receiver<Event>,
) -> Result<()> {
    while let Some(event) = rx.recv().await {
        match session.handle(event)? {
            Flow::Continue => {}
            Flow::Settle(delay) => tokio::time::sleep(delay).await,
            Flow::Exit => return Ok(()),
        }
    }

    debug!("Event sources closed");
    Ok(())
}

/// Run a renderer for window `id` on the terminal until the user exits.
pub async fn run(id: WindowId, channel_dir: &Path, config: RendererConfig) -> Result<()> {
    let channel = Channel::for_window(channel_dir, id);
    info!(window = %id, path = %channel.path().display(), "Starting renderer");

    let (tx, mut rx) = mpsc::channel(EVENT_QUEUE);
    let reader = ChannelReader::spawn(channel.clone(), tx.clone())?;
    spawn_stdin_reader(tx.clone())?;
    let _pause = spawn_pause_listener(tx);

    let mut session = Session::new(channel, std::io::stdout(), config).with_reader(reader);
    drive(&mut session, &mut rx).await
}
