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

//! Diagnostic macros.
//!
//! Diagnostics meant for the person watching a window are printed as plain
//! lines starting with [`DIAG_PREFIX`](crate::DIAG_PREFIX), so they never blend
//! in with rendered variables. Every line is mirrored into `tracing`.

/// Print an `sD> Error: ...` line to stderr and log it as an error.
///
/// ```
/// sdbg_common::sd_error!("could not create FIFO for window {}", 3);
/// ```
#[macro_export]
macro_rules! sd_error {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::tracing::error!("{}", message);
        eprintln!("{} Error: {}", $crate::DIAG_PREFIX, message);
    }};
}

/// Write an `sD> ...` line to the given writer and log it at info level.
///
/// Evaluates to the `io::Result<()>` of the write.
///
/// ```
/// let mut out = Vec::new();
/// sdbg_common::sd_note!(&mut out, "Continuing...").unwrap();
/// assert_eq!(out, b"sD> Continuing...\n");
/// ```
#[macro_export]
macro_rules! sd_note {
    ($out:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::tracing::info!("{}", message);
        ::std::io::Write::write_all(
            $out,
            format!("{} {}\n", $crate::DIAG_PREFIX, message).as_bytes(),
        )
    }};
}
