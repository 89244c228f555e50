//! Lookup structures filled while the tree is built.
//!
//! - [`OffsetIndex`]: record offset to row, for jumping along references
//! - [`NameList`]: searchable names in insertion order, walked newest first
//!
//! Both are keyed to the offsets of one image and are discarded with it.

use std::collections::HashMap;

use tracing::warn;

use crate::source::RecordOffset;
use crate::tree::RowId;

/// Write-once mapping from record offset to the row showing it.
#[derive(Debug, Clone, Default)]
pub struct OffsetIndex
{
    rows: HashMap<RecordOffset, RowId>,
}

impl OffsetIndex
{
    /// Register the row of a record.
    ///
    /// An offset that is already present keeps its first row; the duplicate is
    /// logged and `false` returned.
    pub fn insert(&mut self, offset: RecordOffset, row: RowId) -> bool
    {
        if let Some(existing) = self.rows.get(&offset) {
            warn!(offset, ?existing, ?row, "record emitted twice");
            return false;
        }
        self.rows.insert(offset, row);
        true
    }

    #[must_use]
    pub fn get(&self, offset: RecordOffset) -> Option<RowId>
    {
        self.rows.get(&offset).copied()
    }

    #[must_use]
    pub fn contains(&self, offset: RecordOffset) -> bool
    {
        self.rows.contains_key(&offset)
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.rows.is_empty()
    }

    pub fn clear(&mut self)
    {
        self.rows.clear();
    }
}

/// One searchable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry
{
    pub name: String,
    pub row: RowId,
    pub offset: RecordOffset,
    /// Record is declaration-only
    pub declaration: bool,
}

/// Insertion-ordered list of searchable names.
#[derive(Debug, Clone, Default)]
pub struct NameList
{
    entries: Vec<NameEntry>,
}

impl NameList
{
    pub fn push(&mut self, entry: NameEntry)
    {
        self.entries.push(entry);
    }

    /// Entry `position` places back from the most recent one.
    #[must_use]
    pub fn recent(&self, position: usize) -> Option<&NameEntry>
    {
        let index = self.entries.len().checked_sub(position + 1)?;
        self.entries.get(index)
    }

    /// Entries from most recent to oldest.
    pub fn iter_recent(&self) -> impl Iterator<Item = &NameEntry>
    {
        self.entries.iter().rev()
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    pub fn clear(&mut self)
    {
        self.entries.clear();
    }
}

/// All indices of one image.
#[derive(Debug, Clone, Default)]
pub struct DisplayIndex
{
    pub offsets: OffsetIndex,
    pub functions: NameList,
    pub variables: NameList,
}

impl DisplayIndex
{
    pub fn clear(&mut self)
    {
        self.offsets.clear();
        self.functions.clear();
        self.variables.clear();
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn entry(name: &str, row: usize) -> NameEntry
    {
        NameEntry {
            name: name.to_string(),
            row: RowId(row),
            offset: row as u64,
            declaration: false,
        }
    }

    #[test]
    fn test_offset_index_is_write_once()
    {
        let mut index = OffsetIndex::default();
        assert!(index.insert(0x10, RowId(1)));
        assert!(!index.insert(0x10, RowId(2)));
        assert_eq!(index.get(0x10), Some(RowId(1)));
        assert!(index.contains(0x10));
        assert!(!index.contains(0x20));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_name_list_recent_order()
    {
        let mut list = NameList::default();
        list.push(entry("first", 0));
        list.push(entry("second", 1));

        assert_eq!(list.recent(0).map(|e| e.name.as_str()), Some("second"));
        assert_eq!(list.recent(1).map(|e| e.name.as_str()), Some("first"));
        assert!(list.recent(2).is_none());
        let names: Vec<_> = list.iter_recent().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["second", "first"]);
    }
}
