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

//! Named-pipe channel between a producer and its renderer.
//!
//! The two roles have deliberately asymmetric contracts:
//! - the producer opens without blocking, treats "nobody is listening" as a
//!   dropped frame rather than a failure, and otherwise writes the whole
//!   payload before closing;
//! - the renderer blocks in `open` until a writer shows up, reads the whole
//!   payload and closes its end again.
//!
//! Frames are at-most-once. A write that lands while the renderer is between
//! two read cycles is lost, which is why producers are asked to leave a couple
//! of milliseconds between successive writes on the same channel.

use std::{
    ffi::CString,
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    os::unix::{
        ffi::OsStrExt,
        fs::{FileTypeExt, OpenOptionsExt},
        io::AsRawFd,
    },
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, trace};

use crate::WindowId;

/// Permission bits of a freshly created channel.
const CHANNEL_MODE: libc::mode_t = 0o600;

/// Errors raised by channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The backing pipe could not be created
    #[error("could not create channel {}: {source}", path.display())]
    Create {
        /// Channel path
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },
    /// The backing pipe does not exist when a reader needs it
    #[error("could not find channel {}", path.display())]
    Missing {
        /// Channel path
        path: PathBuf,
    },
    /// The backing pipe could not be deleted
    #[error("could not find channel {} to delete: {source}", path.display())]
    Remove {
        /// Channel path
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },
    /// Any other I/O failure on an existing channel
    #[error("I/O error on channel {}: {source}", path.display())]
    Io {
        /// Channel path
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },
}

/// Why a producer write was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No renderer currently has the channel open for reading
    NoReader,
    /// The backing pipe is gone
    Missing,
}

/// Result of a producer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The payload was handed to an attached reader
    Delivered,
    /// The payload was discarded
    Dropped(DropReason),
}

impl WriteOutcome {
    /// Whether the payload reached a reader
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// A named, filesystem-resident, unidirectional byte channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    path: PathBuf,
}

impl Channel {
    /// Channel backed by an arbitrary path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Channel of window `id` inside `dir`
    pub fn for_window(dir: &Path, id: WindowId) -> Self {
        Self::new(id.channel_path(dir))
    }

    /// Path of the backing pipe
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing pipe currently exists
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(&self.path).map(|m| m.file_type().is_fifo()).unwrap_or(false)
    }

    /// Create the backing pipe if it does not exist yet.
    ///
    /// Succeeds without touching the filesystem when the pipe is already there.
    pub fn ensure(&self) -> Result<(), ChannelError> {
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_fifo() => return Ok(()),
            Ok(_) => {
                return Err(self.create_error(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "path exists and is not a named pipe",
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(self.create_error(e)),
        }

        let c_path = CString::new(self.path.as_os_str().as_bytes()).map_err(|_| {
            self.create_error(io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))
        })?;

        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), CHANNEL_MODE) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            // Lost a creation race with another process, the pipe is there now
            if err.kind() == io::ErrorKind::AlreadyExists && self.exists() {
                return Ok(());
            }
            return Err(self.create_error(err));
        }

        debug!(path = %self.path.display(), "Created channel");
        Ok(())
    }

    /// Write one payload without waiting for a reader.
    ///
    /// Opens the pipe in non-blocking mode so that a missing pipe or a missing
    /// reader drop the frame right away; both are reported as
    /// [`WriteOutcome::Dropped`], not as errors. Once a reader is attached the
    /// descriptor is switched back to blocking mode and the whole payload is
    /// written, however large, so the reader never sees a partial frame. When
    /// `delay` is non-zero the call sleeps afterwards so that bursty callers
    /// keep a safe distance between writes.
    pub fn try_write(&self, payload: &[u8], delay: Duration) -> Result<WriteOutcome, ChannelError> {
        let outcome = self.write_once(payload);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        outcome
    }

    fn write_once(&self, payload: &[u8]) -> Result<WriteOutcome, ChannelError> {
        let mut file = match OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {
                trace!(path = %self.path.display(), "No reader attached, dropping frame");
                return Ok(WriteOutcome::Dropped(DropReason::NoReader));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "Channel missing, dropping frame");
                return Ok(WriteOutcome::Dropped(DropReason::Missing));
            }
            Err(e) => return Err(self.io_error(e)),
        };
        set_blocking(&file).map_err(|e| self.io_error(e))?;

        match file.write_all(payload) {
            Ok(()) => Ok(WriteOutcome::Delivered),
            // The reader went away between our open and our write
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                Ok(WriteOutcome::Dropped(DropReason::NoReader))
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Block until a writer completes a write-and-close cycle and return its payload.
    ///
    /// An empty payload means a writer opened and closed without writing
    /// anything, see [`Channel::wake`].
    pub fn blocking_read(&self) -> Result<Vec<u8>, ChannelError> {
        if !self.exists() {
            return Err(ChannelError::Missing { path: self.path.clone() });
        }

        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ChannelError::Missing { path: self.path.clone() })
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let mut payload = Vec::new();
        file.read_to_end(&mut payload).map_err(|e| self.io_error(e))?;
        Ok(payload)
    }

    /// Release a reader blocked in [`Channel::blocking_read`].
    ///
    /// The reader observes an empty payload. Does nothing when no reader is
    /// waiting.
    pub fn wake(&self) {
        let _ = OpenOptions::new().write(true).custom_flags(libc::O_NONBLOCK).open(&self.path);
    }

    /// Delete the backing pipe.
    pub fn remove(&self) -> Result<(), ChannelError> {
        fs::remove_file(&self.path)
            .map_err(|source| ChannelError::Remove { path: self.path.clone(), source })?;
        debug!(path = %self.path.display(), "Removed channel");
        Ok(())
    }

    fn create_error(&self, source: io::Error) -> ChannelError {
        ChannelError::Create { path: self.path.clone(), source }
    }

    fn io_error(&self, source: io::Error) -> ChannelError {
        ChannelError::Io { path: self.path.clone(), source }
    }
}

/// Clear `O_NONBLOCK` on an open descriptor.
fn set_blocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    // SAFETY: `fd` is a valid descriptor owned by `file` for the whole call.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above, only the status flags are changed.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
