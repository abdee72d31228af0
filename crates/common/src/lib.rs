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

//! sdbg common - shared building blocks for the producer and the renderer
//!
//! This crate holds everything both sides of a debug window must agree on:
//! the snapshot data model, the snapshot wire codec, the named-pipe channel,
//! environment variable names and the logging setup.

/// Core data types: window identities, variable entries and snapshots
pub mod types;

/// Named-pipe channel carrying one snapshot payload per write/read cycle
pub mod channel;
/// Versioned, length-prefixed snapshot wire codec
pub mod codec;
/// Environment variable names understood by sdbg components
pub mod env;
/// Logging setup and utilities for consistent logging across sdbg components
pub mod logging;
/// `sD>`-prefixed diagnostic macros
pub mod macros;

pub use channel::*;
pub use codec::*;
pub use types::*;

/// Prefix that marks diagnostic lines so they stand apart from rendered variables.
pub const DIAG_PREFIX: &str = "sD>";

#[doc(hidden)]
pub use tracing;
