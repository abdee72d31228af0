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

//! Renderer state machine.
//!
//! ```text
//!             frame                pause
//!   Reading ---------> Displaying  Reading ---------> Paused
//!      ^                   |                           |  |  \
//!      +-------------------+        resume / other key |  S   Q, E, EOF, pause
//!      ^                                               |  |    \
//!      +-----------------------------------------------+  v     v
//!      +------------------------------------------- Saving    Exiting
//! ```
//!
//! [`Session::handle`] consumes one [`Event`] at a time. Displaying and Saving
//! are transient: they are entered and left within a single call.

use std::{
    io::{self, Write},
    time::Duration,
};

use chrono::Local;
use crossterm::{
    cursor::MoveTo,
    queue,
    terminal::{Clear, ClearType},
};
use eyre::{Result, WrapErr};
use sdbg_common::{codec, sd_note, Channel, ChannelError};
use tracing::{debug, error, info, warn};

use crate::{
    format::{format_frame, CURSOR, PROMPT},
    reader::ChannelReader,
    save::save_frame,
    RendererConfig,
};

/// Renderer session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next frame
    Reading,
    /// Decoding and drawing a frame
    Displaying,
    /// Waiting for the user to pick resume, save or exit
    Paused,
    /// Writing the last frame to a file
    Saving,
    /// The channel has been removed, nothing else will happen
    Exiting,
}

/// Inputs driving a session.
#[derive(Debug)]
pub enum Event {
    /// A payload read from the channel
    Frame(Vec<u8>),
    /// The user asked to pause (Ctrl-C)
    Pause,
    /// A line typed by the user, `None` once input is closed
    Input(Option<String>),
    /// The channel could not be read any more
    ChannelLost(ChannelError),
}

/// What the driver should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Wait for the next event
    Continue,
    /// Sleep for the given time, then wait for the next event
    Settle(Duration),
    /// The session is over
    Exit,
}

/// One renderer session bound to a channel.
pub struct Session<W: Write> {
    channel: Channel,
    out: W,
    config: RendererConfig,
    state: SessionState,
    last_frame: Option<String>,
    frames_shown: u64,
    input_closed: bool,
    reader: Option<ChannelReader>,
}

impl<W: Write> Session<W> {
    /// Create a session drawing frames from `channel` into `out`
    pub fn new(channel: Channel, out: W, config: RendererConfig) -> Self {
        Self {
            channel,
            out,
            config,
            state: SessionState::Reading,
            last_frame: None,
            frames_shown: 0,
            input_closed: false,
            reader: None,
        }
    }

    /// Stop `reader` when the session exits
    pub fn with_reader(mut self, reader: ChannelReader) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Text of the most recently displayed frame
    pub fn last_frame(&self) -> Option<&str> {
        self.last_frame.as_deref()
    }

    /// Number of frames displayed so far
    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    /// The display writer
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Channel this session reads from
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Process one event.
    ///
    /// Only a lost channel is an error; everything else is absorbed and
    /// reported on the display.
    pub fn handle(&mut self, event: Event) -> Result<Flow> {
        match (self.state, event) {
            (SessionState::Exiting, _) => Ok(Flow::Exit),
            (_, Event::ChannelLost(e)) => {
                let _ = sd_note!(
                    &mut self.out,
                    "Error: Could not find pipe {}!",
                    self.channel.path().display()
                );
                let _ = self.out.flush();
                Err(e).wrap_err("renderer lost its channel")
            }
            (SessionState::Reading, Event::Frame(payload)) => self.display(&payload),
            (SessionState::Reading, Event::Pause) => self.pause(),
            (SessionState::Reading, Event::Input(None)) => {
                debug!("Input closed");
                self.input_closed = true;
                Ok(Flow::Continue)
            }
            (SessionState::Reading, Event::Input(Some(line))) => {
                debug!("Ignoring input while not paused: {:?}", line);
                Ok(Flow::Continue)
            }
            (SessionState::Paused, Event::Pause | Event::Input(None)) => self.exit(),
            (SessionState::Paused, Event::Input(Some(line))) => self.choose(&line),
            (SessionState::Paused, Event::Frame(_)) => {
                debug!("Dropping frame received while paused");
                Ok(Flow::Continue)
            }
            // Transient states never outlive a call to `handle`
            (SessionState::Displaying | SessionState::Saving, _) => Ok(Flow::Continue),
        }
    }

    fn display(&mut self, payload: &[u8]) -> Result<Flow> {
        self.state = SessionState::Displaying;

        let mut latest = None;
        for frame in codec::frames(payload) {
            match frame {
                Ok(snapshot) => latest = Some(snapshot),
                Err(e) => {
                    warn!("Discarding malformed frame ({} bytes): {}", payload.len(), e);
                    break;
                }
            }
        }

        if let Some(snapshot) = latest {
            let text = format_frame(&snapshot);
            self.draw(&text)?;
            self.last_frame = Some(text);
            self.frames_shown += 1;
        }

        self.state = SessionState::Reading;
        Ok(Flow::Continue)
    }

    fn draw(&mut self, text: &str) -> io::Result<()> {
        if self.config.clear_screen {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        self.out.write_all(text.as_bytes())?;
        self.out.write_all(CURSOR.as_bytes())?;
        self.out.flush()
    }

    fn pause(&mut self) -> Result<Flow> {
        if self.input_closed {
            info!("Pause requested with input closed, exiting");
            return self.exit();
        }

        info!("Paused");
        self.state = SessionState::Paused;
        write!(self.out, "\n{PROMPT}\n{CURSOR}")?;
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    fn choose(&mut self, line: &str) -> Result<Flow> {
        match line.trim_start().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('Q' | 'E') => self.exit(),
            Some('S') => self.save(),
            _ => {
                sd_note!(&mut self.out, "Continuing...")?;
                self.out.flush()?;
                self.state = SessionState::Reading;
                Ok(Flow::Settle(self.config.resume_delay()))
            }
        }
    }

    fn save(&mut self) -> Result<Flow> {
        self.state = SessionState::Saving;

        let settle = match save_frame(&self.config.save_dir(), self.last_frame(), &Local::now()) {
            Ok(path) => {
                sd_note!(&mut self.out, "Snapped screen to '{}'.", path.display())?;
                sd_note!(&mut self.out, "Continuing...")?;
                self.config.save_delay()
            }
            Err(e) => {
                error!("Snapshot save failed: {}", e);
                sd_note!(&mut self.out, "Error: File could not be written to! ({})", e)?;
                self.config.save_error_delay()
            }
        };
        self.out.flush()?;

        self.state = SessionState::Reading;
        Ok(Flow::Settle(settle))
    }

    fn exit(&mut self) -> Result<Flow> {
        self.state = SessionState::Exiting;

        if let Some(reader) = self.reader.take() {
            reader.stop();
        }

        if let Err(e) = self.channel.remove() {
            error!("{}", e);
            sd_note!(
                &mut self.out,
                "Error: could not find pipe {} to delete!",
                self.channel.path().display()
            )?;
        }

        writeln!(self.out)?;
        sd_note!(&mut self.out, "This window may be closed now...")?;
        self.out.flush()?;
        Ok(Flow::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdbg_common::{Snapshot, VariableEntry, WindowId};
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        session: Session<Vec<u8>>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let channel = Channel::for_window(dir.path(), WindowId::new(0));
        channel.ensure().unwrap();
        let config = RendererConfig {
            resume_delay_ms: 0,
            save_delay_ms: 0,
            save_error_delay_ms: 0,
            clear_screen: false,
            save_dir: Some(dir.path().join("snaps")),
        };
        fs::create_dir(dir.path().join("snaps")).unwrap();
        Fixture { session: Session::new(channel, Vec::new(), config), dir }
    }

    fn frame(entries: &[(&str, &str, &str)]) -> Event {
        let snapshot = Snapshot::new(
            entries.iter().map(|(n, v, t)| VariableEntry::new(*n, *v, *t)).collect(),
        );
        Event::Frame(codec::encode(&snapshot).unwrap())
    }

    fn output(session: &Session<Vec<u8>>) -> String {
        String::from_utf8_lossy(session.output()).into_owned()
    }

    fn snaps(fx: &Fixture) -> Vec<std::path::PathBuf> {
        fs::read_dir(fx.dir.path().join("snaps")).unwrap().map(|e| e.unwrap().path()).collect()
    }

    #[test]
    fn test_frames_are_displayed_in_order() {
        let mut fx = fixture();
        let s = &mut fx.session;

        assert_eq!(s.handle(frame(&[("x", "1", "int")])).unwrap(), Flow::Continue);
        assert_eq!(s.handle(frame(&[("y", "2.5", "float")])).unwrap(), Flow::Continue);
        assert_eq!(s.state(), SessionState::Reading);
        assert_eq!(s.frames_shown(), 2);

        let out = output(s);
        let x_at = out.find("x                int").unwrap();
        let y_at = out.find("y                float").unwrap();
        assert!(x_at < y_at);
        assert_eq!(out.matches("# : VARIABLE").count(), 2);
        assert!(s.last_frame().unwrap().contains("y "));
        assert!(!s.last_frame().unwrap().contains("x "));
    }

    #[test]
    fn test_malformed_frame_is_discarded() {
        let mut fx = fixture();
        let s = &mut fx.session;

        assert_eq!(s.handle(Event::Frame(b"garbage".to_vec())).unwrap(), Flow::Continue);
        assert_eq!(s.state(), SessionState::Reading);
        assert_eq!(s.frames_shown(), 0);
        assert!(s.output().is_empty());

        s.handle(frame(&[("x", "1", "int")])).unwrap();
        assert_eq!(s.frames_shown(), 1);
    }

    #[test]
    fn test_pause_then_resume() {
        let mut fx = fixture();
        let s = &mut fx.session;

        s.handle(frame(&[("x", "1", "int")])).unwrap();
        s.handle(Event::Pause).unwrap();
        assert_eq!(s.state(), SessionState::Paused);
        assert!(output(s).contains(PROMPT));

        // Frames arriving while paused are dropped
        s.handle(frame(&[("dropped", "0", "int")])).unwrap();
        assert_eq!(s.frames_shown(), 1);

        assert_eq!(s.handle(Event::Input(Some(String::new()))).unwrap(), Flow::Settle(Duration::ZERO));
        assert_eq!(s.state(), SessionState::Reading);
        assert!(output(s).contains("sD> Continuing..."));

        s.handle(frame(&[("z", "3", "int")])).unwrap();
        assert_eq!(s.frames_shown(), 2);
        assert!(s.last_frame().unwrap().contains("z "));
    }

    #[test]
    fn test_unknown_key_resumes() {
        let mut fx = fixture();
        let s = &mut fx.session;

        s.handle(Event::Pause).unwrap();
        s.handle(Event::Input(Some("x".into()))).unwrap();
        assert_eq!(s.state(), SessionState::Reading);
        assert!(s.channel().exists());
    }

    #[test]
    fn test_double_pause_exits_and_removes_channel() {
        let mut fx = fixture();
        let s = &mut fx.session;

        s.handle(Event::Pause).unwrap();
        assert_eq!(s.handle(Event::Pause).unwrap(), Flow::Exit);
        assert_eq!(s.state(), SessionState::Exiting);
        assert!(!s.channel().exists());
        assert!(output(s).contains("sD> This window may be closed now..."));

        // Terminal state
        assert_eq!(s.handle(frame(&[("x", "1", "int")])).unwrap(), Flow::Exit);
    }

    #[test]
    fn test_quit_keys_exit() {
        for key in ["q", "Q", "e", "Exit"] {
            let mut fx = fixture();
            let s = &mut fx.session;
            s.handle(Event::Pause).unwrap();
            assert_eq!(s.handle(Event::Input(Some(key.into()))).unwrap(), Flow::Exit, "{key}");
            assert!(!s.channel().exists());
        }
    }

    #[test]
    fn test_end_of_input_exits_when_paused() {
        let mut fx = fixture();
        let s = &mut fx.session;

        s.handle(Event::Pause).unwrap();
        assert_eq!(s.handle(Event::Input(None)).unwrap(), Flow::Exit);
    }

    #[test]
    fn test_pause_after_input_closed_exits() {
        let mut fx = fixture();
        let s = &mut fx.session;

        s.handle(Event::Input(None)).unwrap();
        assert_eq!(s.state(), SessionState::Reading);
        assert_eq!(s.handle(Event::Pause).unwrap(), Flow::Exit);
    }

    #[test]
    fn test_exit_reports_vanished_channel() {
        let mut fx = fixture();
        let s = &mut fx.session;

        s.channel().remove().unwrap();
        s.handle(Event::Pause).unwrap();
        assert_eq!(s.handle(Event::Input(Some("q".into()))).unwrap(), Flow::Exit);

        let out = output(s);
        assert!(out.contains("sD> Error: could not find pipe"));
        assert!(out.contains("This window may be closed now"));
    }

    #[test]
    fn test_exit_with_live_reader_after_channel_removed() {
        let fx = fixture();
        let (tx, _events) = tokio::sync::mpsc::channel(8);
        let reader = ChannelReader::spawn(fx.session.channel().clone(), tx).unwrap();
        let mut session = fx.session.with_reader(reader);

        // The reader is blocked opening the pipe when it disappears
        std::thread::sleep(Duration::from_millis(200));
        session.channel().remove().unwrap();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            session.handle(Event::Pause).unwrap();
            let flow = session.handle(Event::Pause).unwrap();
            let _ = done_tx.send((flow, output(&session)));
        });

        let (flow, out) = done_rx.recv_timeout(Duration::from_secs(5)).expect("exit hung");
        assert_eq!(flow, Flow::Exit);
        assert!(out.contains("sD> Error: could not find pipe"));
        assert!(out.contains("sD> This window may be closed now..."));
        drop(fx.dir);
    }

    #[test]
    fn test_save_writes_last_frame() {
        let mut fx = fixture();
        fx.session.handle(frame(&[("x", "1", "int")])).unwrap();
        fx.session.handle(Event::Pause).unwrap();
        let flow = fx.session.handle(Event::Input(Some("s".into()))).unwrap();

        assert_eq!(flow, Flow::Settle(Duration::ZERO));
        assert_eq!(fx.session.state(), SessionState::Reading);
        assert!(output(&fx.session).contains("sD> Snapped screen to '"));

        let files = snaps(&fx);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sD_snap_") && name.ends_with(".txt"));
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), fx.session.last_frame().unwrap());
    }

    #[test]
    fn test_save_without_frame_reports_and_continues() {
        let mut fx = fixture();
        fx.session.handle(Event::Pause).unwrap();
        fx.session.handle(Event::Input(Some("S".into()))).unwrap();

        assert_eq!(fx.session.state(), SessionState::Reading);
        assert!(output(&fx.session).contains("sD> Error: File could not be written to!"));
        assert!(snaps(&fx).is_empty());

        fx.session.handle(frame(&[("x", "1", "int")])).unwrap();
        assert_eq!(fx.session.frames_shown(), 1);
    }

    #[test]
    fn test_lost_channel_is_fatal() {
        let mut fx = fixture();
        let path = fx.session.channel().path().to_path_buf();
        let err = fx
            .session
            .handle(Event::ChannelLost(ChannelError::Missing { path }))
            .unwrap_err();

        assert!(format!("{err:?}").contains("could not find channel"));
        assert!(output(&fx.session).contains("sD> Error: Could not find pipe"));
    }

    #[test]
    fn test_clear_screen_emits_escape_sequence() {
        let mut fx = fixture();
        fx.session.config.clear_screen = true;
        fx.session.handle(frame(&[("x", "1", "int")])).unwrap();
        assert!(output(&fx.session).starts_with('\u{1b}'));
    }
}
