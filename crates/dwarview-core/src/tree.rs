//! Display-tree rows.
//!
//! The tree builder emits rows into a [`RowSink`]; a sink only has to append a
//! row under a parent and hand back a handle for it. [`TreeModel`] is the sink
//! the session uses: an arena of rows with parent and child links that a
//! front end can render directly.

use crate::source::RecordOffset;

/// Handle of an emitted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub usize);

/// How a row is set apart from ordinary definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeclMarker
{
    #[default]
    None,
    /// Record carries `DW_AT_declaration`; shown with a `(decl)` suffix
    Declaration,
    /// `imported_declaration` record; shown dimmed, no suffix
    Imported,
}

/// Content of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowData
{
    /// Record shown by this row; `None` for bucket rows
    pub offset: Option<RecordOffset>,
    /// Record kind, or `meta` for bucket rows
    pub label: String,
    pub name: String,
    pub marker: DeclMarker,
}

impl RowData
{
    /// Label of synthetic bucket rows.
    pub const META_LABEL: &'static str = "meta";

    /// A synthetic bucket row.
    #[must_use]
    pub fn bucket(name: &str) -> Self
    {
        Self {
            offset: None,
            label: Self::META_LABEL.to_string(),
            name: name.to_string(),
            marker: DeclMarker::None,
        }
    }

    #[must_use]
    pub fn is_bucket(&self) -> bool
    {
        self.offset.is_none()
    }

    /// Name with the declaration suffix applied.
    #[must_use]
    pub fn display_name(&self) -> String
    {
        match self.marker {
            DeclMarker::Declaration => format!("{} (decl)", self.name),
            DeclMarker::None | DeclMarker::Imported => self.name.clone(),
        }
    }
}

/// Receiver of emitted rows.
pub trait RowSink
{
    /// Append a row as the last child of `parent` (or as a root).
    fn append(&mut self, parent: Option<RowId>, data: RowData) -> RowId;
}

/// A row stored in a [`TreeModel`].
#[derive(Debug, Clone)]
pub struct Row
{
    pub data: RowData,
    pub parent: Option<RowId>,
    pub children: Vec<RowId>,
}

/// Arena-backed display tree.
#[derive(Debug, Clone, Default)]
pub struct TreeModel
{
    rows: Vec<Row>,
    roots: Vec<RowId>,
}

impl TreeModel
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    #[must_use]
    pub fn row(&self, id: RowId) -> Option<&Row>
    {
        self.rows.get(id.0)
    }

    #[must_use]
    pub fn data(&self, id: RowId) -> Option<&RowData>
    {
        self.row(id).map(|row| &row.data)
    }

    #[must_use]
    pub fn children(&self, id: RowId) -> &[RowId]
    {
        self.row(id).map_or(&[], |row| row.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, id: RowId) -> Option<RowId>
    {
        self.row(id).and_then(|row| row.parent)
    }

    #[must_use]
    pub fn roots(&self) -> &[RowId]
    {
        &self.roots
    }

    /// Ancestors of a row, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: RowId) -> Vec<RowId>
    {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Number of rows, buckets included.
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

    /// Remove every row.
    pub fn clear(&mut self)
    {
        self.rows.clear();
        self.roots.clear();
    }
}

impl RowSink for TreeModel
{
    fn append(&mut self, parent: Option<RowId>, data: RowData) -> RowId
    {
        let id = RowId(self.rows.len());
        let parent = parent.filter(|parent| parent.0 < id.0);
        self.rows.push(Row {
            data,
            parent,
            children: Vec::new(),
        });
        match parent.and_then(|parent| self.rows.get_mut(parent.0)) {
            Some(parent_row) => parent_row.children.push(id),
            None => self.roots.push(id),
        }
        id
    }
}
