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

//! Event sources feeding a [`Session`](crate::Session).
//!
//! Reading the channel and stdin both block, so each runs on a dedicated
//! thread and forwards what it gets into the session's event queue.

use std::{
    io::{self, BufRead},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use sdbg_common::Channel;
use tokio::sync::mpsc::{error::TrySendError, Sender};
use tracing::{debug, trace, warn};

use crate::Event;

const WAKE_INTERVAL: Duration = Duration::from_millis(10);
/// How long [`ChannelReader::stop`] waits before leaving the thread behind.
const STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// Thread reading payloads from a channel.
#[derive(Debug)]
pub struct ChannelReader {
    channel: Channel,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ChannelReader {
    /// Start reading `channel`, forwarding every non-empty payload to `tx`.
    pub fn spawn(channel: Channel, tx: Sender<Event>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let channel = channel.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name("sdbg-channel-reader".into())
                .spawn(move || read_loop(&channel, &stop, &tx))?
        };

        Ok(Self { channel, stop, handle })
    }

    /// Stop the reader and wait for its thread to finish.
    ///
    /// Returns `false` when the thread could not be released in time and was
    /// left detached. That happens when the pipe was deleted while the reader
    /// was blocked opening it: nothing can open the write end any more.
    pub fn stop(self) -> bool {
        self.stop.store(true, Ordering::SeqCst);

        let deadline = Instant::now() + STOP_TIMEOUT;
        // The reader may not be blocked on the pipe yet when the first wake-up lands
        while !self.handle.is_finished() && self.channel.exists() && Instant::now() < deadline {
            self.channel.wake();
            thread::sleep(WAKE_INTERVAL);
        }

        if !self.handle.is_finished() {
            warn!(
                path = %self.channel.path().display(),
                "Channel reader did not stop, leaving it detached"
            );
            return false;
        }
        if self.handle.join().is_err() {
            warn!("Channel reader thread panicked");
        }
        true
    }
}

fn read_loop(channel: &Channel, stop: &AtomicBool, tx: &Sender<Event>) {
    while !stop.load(Ordering::SeqCst) {
        let result = channel.blocking_read();
        if stop.load(Ordering::SeqCst) {
            debug!("Channel reader stopped");
            return;
        }

        let payload = match result {
            // Writer opened and closed without data
            Ok(payload) if payload.is_empty() => continue,
            Ok(payload) => payload,
            Err(e) => {
                let _ = tx.try_send(Event::ChannelLost(e));
                return;
            }
        };

        trace!("Read {} bytes from channel", payload.len());
        match tx.try_send(Event::Frame(payload)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Event queue full, dropping frame"),
            Err(TrySendError::Closed(_)) => {
                debug!("Session gone, channel reader exiting");
                return;
            }
        }
    }
}

/// Forward lines typed on stdin, then `Input(None)` once stdin is closed.
///
/// The thread is detached; it ends with the process.
pub fn spawn_stdin_reader(tx: Sender<Event>) -> io::Result<()> {
    thread::Builder::new().name("sdbg-stdin-reader".into()).spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            };
            if tx.blocking_send(Event::Input(Some(line))).is_err() {
                return;
            }
        }
        let _ = tx.blocking_send(Event::Input(None));
    })?;
    Ok(())
}

/// Turn every Ctrl-C into a [`Event::Pause`].
pub fn spawn_pause_listener(tx: Sender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {}", e);
                return;
            }
            debug!("Ctrl-C received");
            if tx.send(Event::Pause).await.is_err() {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdbg_common::{codec, Snapshot, VariableEntry, WindowId, WriteOutcome};
    use tokio::sync::mpsc;

    fn deliver(channel: &Channel, payload: &[u8]) {
        for _ in 0..500 {
            if channel.try_write(payload, Duration::ZERO).unwrap() == WriteOutcome::Delivered {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("reader never attached");
    }

    #[test]
    fn test_reader_forwards_frames_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let channel = Channel::for_window(dir.path(), WindowId::new(0));
        channel.ensure().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let reader = ChannelReader::spawn(channel.clone(), tx).unwrap();

        let payload =
            codec::encode(&Snapshot::new(vec![VariableEntry::new("x", "1", "int")])).unwrap();
        deliver(&channel, &payload);

        match rx.blocking_recv() {
            Some(Event::Frame(got)) => assert_eq!(got, payload),
            other => panic!("unexpected event {other:?}"),
        }

        assert!(reader.stop());
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn test_stop_returns_when_channel_removed_under_reader() {
        let dir = tempfile::tempdir().unwrap();
        let channel = Channel::for_window(dir.path(), WindowId::new(0));
        channel.ensure().unwrap();

        let (tx, _rx) = mpsc::channel(8);
        let reader = ChannelReader::spawn(channel.clone(), tx).unwrap();
        // Let the reader block in open before the pipe goes away
        thread::sleep(Duration::from_millis(200));
        channel.remove().unwrap();

        let started = Instant::now();
        reader.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_reader_reports_missing_channel() {
        let dir = tempfile::tempdir().unwrap();
        let channel = Channel::for_window(dir.path(), WindowId::new(0));

        let (tx, mut rx) = mpsc::channel(8);
        let _reader = ChannelReader::spawn(channel, tx).unwrap();

        assert!(matches!(rx.blocking_recv(), Some(Event::ChannelLost(_))));
    }
}
