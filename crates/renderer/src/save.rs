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

//! Saving the last displayed frame to a text file.

use std::{
    fmt::Display,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeZone};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised while saving a frame.
#[derive(Debug, Error)]
pub enum SaveError {
    /// No frame has been displayed yet
    #[error("no snapshot has been displayed yet")]
    NothingToSave,
    /// The file could not be written
    #[error("could not write {}: {source}", path.display())]
    Io {
        /// Target file
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },
}

/// File name of a snapshot taken at `at`: `sD_snap_<YYYYMMDDHHMMSS>.txt`.
pub fn snapshot_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("sD_snap_{}.txt", at.format("%Y%m%d%H%M%S"))
}

/// Write `frame` verbatim to a timestamp-named file inside `dir`.
///
/// The file only appears once its whole content is on disk; a failed save
/// leaves nothing behind.
pub fn save_frame<Tz>(dir: &Path, frame: Option<&str>, at: &DateTime<Tz>) -> Result<PathBuf, SaveError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let frame = frame.ok_or(SaveError::NothingToSave)?;
    let path = dir.join(snapshot_file_name(at));
    let io_error = |source| SaveError::Io { path: path.clone(), source };

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(frame.as_bytes()).map_err(io_error)?;
    file.flush().map_err(io_error)?;
    file.persist(&path).map_err(|e| io_error(e.error))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, Utc};
    use std::fs;

    #[test]
    fn test_file_name_is_zero_padded() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 5, 4, 9).unwrap();
        assert_eq!(snapshot_file_name(&at), "sD_snap_20240307050409.txt");
    }

    #[test]
    fn test_save_writes_frame_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let frame = "line 1\n  line 2\n";
        let path = save_frame(dir.path(), Some(frame), &Local::now()).unwrap();

        assert_eq!(path.parent().unwrap(), dir.path());
        assert_eq!(fs::read_to_string(&path).unwrap(), frame);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_nothing_to_save_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_frame(dir.path(), None, &Local::now()).unwrap_err();
        assert!(matches!(err, SaveError::NothingToSave));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = save_frame(&missing, Some("frame"), &Local::now()).unwrap_err();
        assert!(matches!(err, SaveError::Io { .. }));
        assert!(!missing.exists());
    }
}
