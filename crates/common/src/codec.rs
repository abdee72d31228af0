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

//! Snapshot wire codec.
//!
//! Every frame is laid out as:
//! - 4-byte magic `sDbg`
//! - 1-byte format version
//! - 4-byte little-endian body length
//! - body: entry count (`u32` LE) followed by, for each entry, the name, value
//!   and type label, each written as a `u32` LE byte length plus UTF-8 bytes
//!
//! Frames are self-delimiting, so a reader that receives two writes in a single
//! open/close cycle can still split them with [`frames`]. Only producers and
//! renderers built from the same codebase are expected to interoperate.

use thiserror::Error;

use crate::{Snapshot, VariableEntry};

/// Magic bytes opening every frame.
pub const MAGIC: [u8; 4] = *b"sDbg";
/// Current wire format version.
pub const VERSION: u8 = 1;
/// Size of the fixed frame header.
pub const HEADER_LEN: usize = MAGIC.len() + 1 + 4;

/// Errors raised while decoding a snapshot payload.
///
/// A decode error only ever invalidates the frame being decoded; the channel it
/// came from remains usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload ended before the announced data
    #[error("payload truncated: needed {needed} bytes, found {available}")]
    Truncated {
        /// Bytes required to continue decoding
        needed: usize,
        /// Bytes actually left
        available: usize,
    },
    /// The payload does not start with [`MAGIC`]
    #[error("payload does not start with the snapshot magic")]
    BadMagic,
    /// The frame was written by an incompatible build
    #[error("unsupported snapshot format version {found} (expected {VERSION})")]
    UnsupportedVersion {
        /// Version byte found in the header
        found: u8,
    },
    /// A text field is not valid UTF-8
    #[error("snapshot field is not valid UTF-8")]
    InvalidUtf8,
    /// The body holds more bytes than its entries account for
    #[error("{0} unexpected trailing bytes in snapshot body")]
    TrailingBytes(usize),
    /// Bytes after the last frame do not form another frame
    #[error("{0} trailing bytes after snapshot frame")]
    TrailingData(usize),
}

/// Errors raised while encoding a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A field, the entry count or the whole body does not fit a `u32` length prefix
    #[error("snapshot too large for the wire format: {0} exceeds u32::MAX")]
    TooLarge(usize),
}

/// Serialize a snapshot into a single frame.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, EncodeError> {
    let mut body = Vec::new();
    put_len(&mut body, snapshot.len())?;
    for entry in snapshot {
        put_str(&mut body, &entry.name)?;
        put_str(&mut body, &entry.value)?;
        put_str(&mut body, &entry.type_name)?;
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&MAGIC);
    frame.push(VERSION);
    put_len(&mut frame, body.len())?;
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode a payload holding exactly one frame.
pub fn decode(bytes: &[u8]) -> Result<Snapshot, DecodeError> {
    let (snapshot, used) = decode_frame(bytes)?;
    if used != bytes.len() {
        return Err(DecodeError::TrailingData(bytes.len() - used));
    }
    Ok(snapshot)
}

/// Decode the first frame of `bytes`, returning it with the number of bytes consumed.
pub fn decode_frame(bytes: &[u8]) -> Result<(Snapshot, usize), DecodeError> {
    let mut header = Reader::new(bytes);
    if header.take(MAGIC.len())? != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = header.take(1)?[0];
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion { found: version });
    }
    let body_len = header.take_u32()? as usize;
    let body = header.take(body_len)?;

    let mut reader = Reader::new(body);
    let count = reader.take_u32()? as usize;
    // Every entry needs at least three length prefixes
    let mut entries = Vec::with_capacity(count.min(body.len() / 12));
    for _ in 0..count {
        let name = reader.take_str()?;
        let value = reader.take_str()?;
        let type_name = reader.take_str()?;
        entries.push(VariableEntry { name, value, type_name });
    }
    if reader.remaining() != 0 {
        return Err(DecodeError::TrailingBytes(reader.remaining()));
    }

    Ok((Snapshot::from_wire(entries), HEADER_LEN + body_len))
}

/// Iterate over the frames packed back to back in `bytes`.
///
/// Iteration stops after the first error since the rest of the payload can no
/// longer be delimited.
pub fn frames(bytes: &[u8]) -> Frames<'_> {
    Frames { rest: bytes, failed: false }
}

/// Iterator returned by [`frames`].
#[derive(Debug)]
pub struct Frames<'a> {
    rest: &'a [u8],
    failed: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Snapshot, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }
        match decode_frame(self.rest) {
            Ok((snapshot, used)) => {
                self.rest = &self.rest[used..];
                Some(Ok(snapshot))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn wire_len(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::TooLarge(len))
}

fn put_len(buf: &mut Vec<u8>, len: usize) -> Result<(), EncodeError> {
    buf.extend_from_slice(&wire_len(len)?.to_le_bytes());
    Ok(())
}

fn put_str(buf: &mut Vec<u8>, value: &str) -> Result<(), EncodeError> {
    put_len(buf, value.len())?;
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated { needed: n, available: self.remaining() });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u32(&mut self) -> Result<u32, DecodeError> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn take_str(&mut self) -> Result<String, DecodeError> {
        let len = self.take_u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }
}
