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

//! Snapshot data model shared by the producer and the renderer.

/// One captured variable: its name plus the textual form of its value and type.
///
/// All three fields are computed by the producer at capture time. No live
/// reference to the original value survives the capture.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableEntry {
    /// Variable name
    pub name: String,
    /// Display form of the value (may span several lines)
    pub value: String,
    /// Type label of the value
    pub type_name: String,
}

impl VariableEntry {
    /// Create a new entry from its three text fields
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), value: value.into(), type_name: type_name.into() }
    }
}

/// The ordered set of variable entries captured by one `update` call.
///
/// Entries are kept in ascending order by name. Entries sharing a name are
/// ordered by value, then by type label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<VariableEntry>,
}

impl Snapshot {
    /// Build a snapshot, sorting the entries by name.
    pub fn new(mut entries: Vec<VariableEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Rebuild a snapshot exactly as it was laid out on the wire.
    pub(crate) fn from_wire(entries: Vec<VariableEntry>) -> Self {
        Self { entries }
    }

    /// Entries in display order
    pub fn entries(&self) -> &[VariableEntry] {
        &self.entries
    }

    /// Iterate over the entries in display order
    pub fn iter(&self) -> std::slice::Iter<'_, VariableEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the snapshot, returning its entries
    pub fn into_entries(self) -> Vec<VariableEntry> {
        self.entries
    }
}

impl FromIterator<VariableEntry> for Snapshot {
    fn from_iter<I: IntoIterator<Item = VariableEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a VariableEntry;
    type IntoIter = std::slice::Iter<'a, VariableEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_sorted_by_name() {
        let snapshot = Snapshot::new(vec![
            VariableEntry::new("zeta", "1", "i32"),
            VariableEntry::new("Alpha", "2", "i32"),
            VariableEntry::new("alpha", "3", "i32"),
            VariableEntry::new("_hidden", "4", "i32"),
        ]);

        let names: Vec<&str> = snapshot.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "_hidden", "alpha", "zeta"]);
    }

    #[test]
    fn test_duplicate_names_fall_back_to_value_order() {
        let snapshot: Snapshot = [
            VariableEntry::new("x", "b", "&str"),
            VariableEntry::new("x", "a", "&str"),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.entries()[0].value, "a");
        assert_eq!(snapshot.entries()[1].value, "b");
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
        assert!(snapshot.into_entries().is_empty());
    }
}
