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

//! Capturing variables as text.
//!
//! A debug window never holds on to the values it shows. At `update` time each
//! value is turned into a display string and a type label, and only those
//! strings travel to the renderer.

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display},
};

use sdbg_common::{Snapshot, VariableEntry};

/// Anything that can be shown in a debug window: it has a display string and a
/// type label.
///
/// Implemented for every [`Debug`] type. Use [`Variables::insert_display`] to
/// show a value through its [`Display`] implementation instead.
pub trait Inspect {
    /// Text shown in the value column
    fn value_text(&self) -> String;
    /// Label shown in the type column
    fn type_text(&self) -> String;
}

impl<T: Debug + ?Sized> Inspect for T {
    fn value_text(&self) -> String {
        format!("{self:?}")
    }

    fn type_text(&self) -> String {
        short_type_name(std::any::type_name::<T>())
    }
}

/// Strip module paths from a type name, e.g.
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
            continue;
        }
        out.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = out.len();
        }
    }

    out
}

/// A named collection of captured variables, kept in name order.
///
/// Inserting a name twice replaces the earlier capture.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Variables {
    entries: BTreeMap<String, VariableEntry>,
}

impl Variables {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `value` under `name` using its [`Inspect`] form
    pub fn insert<T: Inspect + ?Sized>(&mut self, name: impl Into<String>, value: &T) -> &mut Self {
        let name = name.into();
        let entry = VariableEntry::new(name.clone(), value.value_text(), value.type_text());
        self.entries.insert(name, entry);
        self
    }

    /// Capture `value` under `name` using its [`Display`] form.
    ///
    /// Strings keep their line breaks this way, which the renderer aligns under
    /// the value column.
    pub fn insert_display<T: Display + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> &mut Self {
        let name = name.into();
        let entry = VariableEntry::new(
            name.clone(),
            value.to_string(),
            short_type_name(std::any::type_name::<T>()),
        );
        self.entries.insert(name, entry);
        self
    }

    /// Insert an already captured entry
    pub fn insert_entry(&mut self, entry: VariableEntry) -> &mut Self {
        self.entries.insert(entry.name.clone(), entry);
        self
    }

    /// Builder form of [`Variables::insert`]
    pub fn with<T: Inspect + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.insert(name, value);
        self
    }

    /// Move the named variables into a new collection.
    ///
    /// Names that are not present are skipped.
    pub fn take<I, S>(&mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut taken = Self::new();
        for name in names {
            if let Some(entry) = self.entries.remove(name.as_ref()) {
                taken.entries.insert(entry.name.clone(), entry);
            }
        }
        taken
    }

    /// Captured entry for `name`
    pub fn get(&self, name: &str) -> Option<&VariableEntry> {
        self.entries.get(name)
    }

    /// Whether `name` has been captured
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of captured variables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been captured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the snapshot sent to the renderer
    pub fn snapshot(&self) -> Snapshot {
        self.entries.values().cloned().collect()
    }
}

impl Debug for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, &v.value))).finish()
    }
}

impl<K: Into<String>, V: Inspect> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (name, value) in iter {
            vars.insert(name, &value);
        }
        vars
    }
}

/// Capture local variables by name.
///
/// `vars!(a, b)` captures `a` and `b` under their own names; `vars!(total = a + b)`
/// captures an expression under an explicit name. Both forms can be mixed.
///
/// ```
/// let count = 3;
/// let name = "demo";
/// let vars = sdbg::vars!(count, name, doubled = count * 2);
/// assert_eq!(vars.get("doubled").unwrap().value, "6");
/// assert_eq!(vars.get("name").unwrap().type_name, "&str");
/// ```
#[macro_export]
macro_rules! vars {
    (@insert $vars:ident;) => {};
    (@insert $vars:ident; $name:ident = $value:expr $(, $($rest:tt)*)?) => {
        $vars.insert(stringify!($name), &$value);
        $crate::vars!(@insert $vars; $($($rest)*)?);
    };
    (@insert $vars:ident; $name:ident $(, $($rest:tt)*)?) => {
        $vars.insert(stringify!($name), &$name);
        $crate::vars!(@insert $vars; $($($rest)*)?);
    };
    ($($body:tt)*) => {{
        #[allow(unused_mut)]
        let mut vars = $crate::Variables::new();
        $crate::vars!(@insert vars; $($body)*);
        vars
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("i32"), "i32");
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(short_type_name("alloc::vec::Vec<alloc::string::String>"), "Vec<String>");
        assert_eq!(
            short_type_name("std::collections::hash::map::HashMap<&str, core::option::Option<u8>>"),
            "HashMap<&str, Option<u8>>"
        );
        assert_eq!(short_type_name("[f64; 3]"), "[f64; 3]");
    }

    #[test]
    fn test_insert_captures_debug_text_and_type() {
        let mut vars = Variables::new();
        vars.insert("x", &1i32).insert("s", &String::from("hi")).insert("v", &vec![1u8, 2]);

        assert_eq!(vars.get("x").unwrap().value, "1");
        assert_eq!(vars.get("x").unwrap().type_name, "i32");
        assert_eq!(vars.get("s").unwrap().value, "\"hi\"");
        assert_eq!(vars.get("s").unwrap().type_name, "String");
        assert_eq!(vars.get("v").unwrap().value, "[1, 2]");
        assert_eq!(vars.get("v").unwrap().type_name, "Vec<u8>");
    }

    #[test]
    fn test_insert_display_keeps_line_breaks() {
        let mut vars = Variables::new();
        vars.insert_display("text", "one\ntwo");
        assert_eq!(vars.get("text").unwrap().value, "one\ntwo");
        assert_eq!(vars.get("text").unwrap().type_name, "str");
    }

    #[test]
    fn test_snapshot_is_sorted_by_name() {
        let vars: Variables = [("zeta", 1), ("alpha", 2), ("mid", 3), ("Beta", 4)].into_iter().collect();
        let snapshot = vars.snapshot();

        let names: Vec<&str> = snapshot.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Beta", "alpha", "mid", "zeta"]);
        assert!(snapshot.entries().windows(2).all(|w| w[0].name <= w[1].name));
    }

    #[test]
    fn test_reinsert_replaces_capture() {
        let mut vars = Variables::new();
        vars.insert("x", &1).insert("x", &2.5f64);
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("x").unwrap().value, "2.5");
        assert_eq!(vars.get("x").unwrap().type_name, "f64");
    }

    #[test]
    fn test_take_moves_named_entries() {
        let mut vars = Variables::new().with("a", &1).with("b", &2).with("c", &3);
        let taken = vars.take(["c", "a", "missing"]);

        assert_eq!(taken.len(), 2);
        assert!(taken.contains("a") && taken.contains("c"));
        assert_eq!(vars.len(), 1);
        assert!(vars.contains("b"));
    }

    #[test]
    fn test_vars_macro_forms() {
        let x = 10;
        let y = "why";
        let vars = crate::vars!(x, y, sum = x + 5,);
        assert_eq!(vars.len(), 3);
        assert_eq!(vars.get("sum").unwrap().value, "15");
        assert_eq!(vars.get("y").unwrap().value, "\"why\"");

        let empty = crate::vars!();
        assert!(empty.is_empty());
    }
}
