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

//! Frame layout.
//!
//! ```text
//!                                  SimpleDebugger
//! ================================================================================
//! # : VARIABLE         TYPE                          = VALUE
//! 1 : x                i32                           = 1
//! ================================================================================
//! sD> PAUSE/EXIT: <Ctrl-C>
//! ```
//!
//! Names and type labels are cut to fixed widths instead of wrapping. Values
//! spanning several lines continue under the value column.

use sdbg_common::Snapshot;

/// Width of the `=` rules.
pub const RULE_WIDTH: usize = 80;
/// Frame title.
pub const TITLE: &str = "SimpleDebugger";
/// Column the title is right-aligned to.
const TITLE_COLUMN: usize = 47;
/// Minimum width of the index column.
const INDEX_COLUMN: usize = 2;
/// Visible characters of a name.
pub const NAME_WIDTH: usize = 15;
const NAME_COLUMN: usize = NAME_WIDTH + 1;
/// Visible characters of a type label.
pub const TYPE_WIDTH: usize = 28;
const TYPE_COLUMN: usize = TYPE_WIDTH + 1;
/// Offset at which values start, and at which their continuation lines are indented.
pub const VALUE_MARGIN: usize = INDEX_COLUMN + 2 + NAME_COLUMN + 1 + TYPE_COLUMN + 2;

/// Footer line closing every frame.
pub const FOOTER: &str = "sD> PAUSE/EXIT: <Ctrl-C>";
/// Choices offered while paused.
pub const PROMPT: &str = "sD> EXIT: <Ctrl-C | D> | Q | E  -  CONTINUE: <ENTER>  -  SAVE: S";
/// Input marker printed after frames and prompts.
pub const CURSOR: &str = "sD> ";

/// Render a snapshot as the text shown in the window.
pub fn format_frame(snapshot: &Snapshot) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = format!("{:>width$}\n{rule}\n", TITLE, width = TITLE_COLUMN);

    out.push_str(&format_row("#", "VARIABLE", "TYPE", "VALUE"));
    for (index, entry) in snapshot.iter().enumerate() {
        out.push_str(&format_row(
            &(index + 1).to_string(),
            &entry.name,
            &entry.type_name,
            &entry.value,
        ));
    }

    out.push_str(&rule);
    out.push('\n');
    out.push_str(FOOTER);
    out.push('\n');
    out
}

fn format_row(index: &str, name: &str, type_name: &str, value: &str) -> String {
    format!(
        "{:<iw$}: {:<nw$} {:<tw$}= {}\n",
        index,
        truncate(name, NAME_WIDTH),
        truncate(type_name, TYPE_WIDTH),
        indent_continuations(value),
        iw = INDEX_COLUMN,
        nw = NAME_COLUMN,
        tw = TYPE_COLUMN,
    )
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn indent_continuations(value: &str) -> String {
    let margin = format!("\n{}", " ".repeat(VALUE_MARGIN));
    value.replace("\r\n", "\n").replace('\n', &margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdbg_common::VariableEntry;

    fn lines(frame: &str) -> Vec<&str> {
        frame.lines().collect()
    }

    #[test]
    fn test_value_margin() {
        assert_eq!(VALUE_MARGIN, 52);
    }

    #[test]
    fn test_frame_layout() {
        let snapshot = Snapshot::new(vec![VariableEntry::new("x", "1", "i32")]);
        let frame = format_frame(&snapshot);
        let lines = lines(&frame);

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], format!("{}{TITLE}", " ".repeat(TITLE_COLUMN - TITLE.len())));
        assert_eq!(lines[1], "=".repeat(RULE_WIDTH));
        assert!(lines[2].starts_with("# : VARIABLE "));
        assert_eq!(&lines[2][VALUE_MARGIN - 2..], "= VALUE");
        assert!(lines[3].starts_with("1 : x "));
        assert_eq!(&lines[3][NAME_COLUMN + 5..NAME_COLUMN + 8], "i32");
        assert_eq!(&lines[3][VALUE_MARGIN - 2..], "= 1");
        assert_eq!(lines[4], "=".repeat(RULE_WIDTH));
        assert_eq!(lines[5], FOOTER);
        assert!(frame.ends_with('\n'));
    }

    #[test]
    fn test_long_fields_are_truncated() {
        let snapshot = Snapshot::new(vec![VariableEntry::new(
            "a_very_long_variable_name",
            "v",
            "std::collections::HashMap<String, Vec<u8>>",
        )]);
        let frame = format_frame(&snapshot);
        let row = lines(&frame)[3];

        assert!(row.contains("a_very_long_var "));
        assert!(!row.contains("a_very_long_vari"));
        assert!(row.contains("std::collections::HashMap<St "));
        assert_eq!(&row[VALUE_MARGIN - 2..], "= v");
    }

    #[test]
    fn test_multiline_value_aligned_under_value_column() {
        let snapshot =
            Snapshot::new(vec![VariableEntry::new("text", "first\nsecond\r\nthird", "String")]);
        let frame = format_frame(&snapshot);
        let lines = lines(&frame);

        assert!(lines[3].ends_with("= first"));
        assert_eq!(lines[4], format!("{}second", " ".repeat(VALUE_MARGIN)));
        assert_eq!(lines[5], format!("{}third", " ".repeat(VALUE_MARGIN)));
        assert_eq!(lines[6], "=".repeat(RULE_WIDTH));
    }

    #[test]
    fn test_indices_count_from_one_and_keep_growing() {
        let entries = (0..12).map(|i| VariableEntry::new(format!("v{i:02}"), "0", "u8")).collect();
        let frame = format_frame(&Snapshot::new(entries));
        let lines = lines(&frame);

        assert!(lines[3].starts_with("1 : v00"));
        assert!(lines[14].starts_with("12: v11"));
    }

    #[test]
    fn test_empty_snapshot_shows_header_only() {
        let frame = format_frame(&Snapshot::default());
        assert_eq!(lines(&frame).len(), 5);
    }
}
