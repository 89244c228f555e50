//! # Incremental Tree Builder
//!
//! Walks the record tree one top-level unit per [`TreeBuilder::advance`] call,
//! emitting rows into a [`RowSink`] and filling the [`DisplayIndex`].
//!
//! ## Row Layout
//!
//! Each unit gets a row of its own followed by four `meta` bucket rows
//! (`functions`, `variables`, `types`, `others`). First-level children of the
//! unit go under the bucket matching their kind; everything below them is
//! nested under its parent record's row. Siblings stay siblings: the walk
//! pushes a record's next sibling before its first child, so children [A, B, C]
//! where A owns A1 come out as A, A1, B, C.
//!
//! ## Failures
//!
//! A record that cannot be read ends that branch with a warning; everything
//! already queued (earlier siblings' followers, other units) still goes out.
//! A record reached a second time, through a looping sibling or child link,
//! ends its branch the same way, so every record is emitted at most once.

use tracing::{debug, info, warn};

use crate::index::{DisplayIndex, NameEntry};
use crate::names::{NameResolver, NO_NAME};
use crate::source::{Record, RecordOffset};
use crate::tables::{self, RecordClass};
use crate::tree::{DeclMarker, RowData, RowId, RowSink};

/// Where the builder is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState
{
    /// Next unit header at or after this section offset
    AtUnit(u64),
    Done,
}

/// Cumulative progress after an [`TreeBuilder::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildProgress
{
    /// Section bytes covered so far
    pub processed: u64,
    /// Section size
    pub total: u64,
    pub units: usize,
    pub records: usize,
    pub done: bool,
}

impl BuildProgress
{
    /// Progress as a whole percentage, clamped to 100.
    #[must_use]
    pub fn percent(&self) -> u64
    {
        if self.total == 0 {
            return 100;
        }
        (self.processed.saturating_mul(100) / self.total).min(100)
    }
}

/// Everything a build step writes to.
pub struct BuildContext<'c, 'a>
{
    pub names: &'c NameResolver<'a>,
    pub sink: &'c mut dyn RowSink,
    pub index: &'c mut DisplayIndex,
}

/// Pending record on the work stack.
struct Pending
{
    offset: RecordOffset,
    /// Row to nest under; `None` for a unit's first-level children, which go
    /// under the bucket of their kind
    parent: Option<RowId>,
}

/// Resumable builder of the display tree.
#[derive(Debug, Clone)]
pub struct TreeBuilder
{
    state: BuildState,
    processed: u64,
    total: u64,
    units: usize,
    records: usize,
}

impl TreeBuilder
{
    /// Start a build over a section of `total` bytes.
    #[must_use]
    pub fn new(total: u64) -> Self
    {
        Self {
            state: BuildState::AtUnit(0),
            processed: 0,
            total,
            units: 0,
            records: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> BuildState
    {
        self.state
    }

    #[must_use]
    pub fn is_done(&self) -> bool
    {
        self.state == BuildState::Done
    }

    #[must_use]
    pub fn progress(&self) -> BuildProgress
    {
        BuildProgress {
            processed: self.processed,
            total: self.total,
            units: self.units,
            records: self.records,
            done: self.is_done(),
        }
    }

    /// Stop the build. Rows already emitted stay.
    pub fn cancel(&mut self)
    {
        if !self.is_done() {
            info!(units = self.units, records = self.records, "tree build canceled");
            self.state = BuildState::Done;
        }
    }

    /// Process one top-level unit.
    pub fn advance(&mut self, ctx: &mut BuildContext<'_, '_>) -> BuildProgress
    {
        let BuildState::AtUnit(offset) = self.state else {
            return self.progress();
        };

        let source = ctx.names.source();
        let Some(unit) = source.next_unit(offset) else {
            self.state = BuildState::Done;
            self.processed = self.total;
            info!(units = self.units, records = self.records, "tree build finished");
            return self.progress();
        };

        // never move backwards, even if a source reports an empty unit
        self.state = BuildState::AtUnit(unit.end.max(unit.header + 1));
        self.processed = unit.end.min(self.total);

        let Some(root) = source.record(unit.root) else {
            warn!(header = unit.header, root = unit.root, "unit root record unreadable, skipping unit");
            return self.progress();
        };

        let before = self.records;
        let unit_row = self.emit(ctx, None, &root);
        let buckets = RecordClass::ALL.map(|class| ctx.sink.append(Some(unit_row), RowData::bucket(class.bucket_name())));
        self.walk(ctx, root.first_child, &buckets);
        self.units += 1;

        debug!(
            unit = unit.root,
            records = self.records - before,
            processed = self.processed,
            total = self.total,
            "unit indexed"
        );
        self.progress()
    }

    fn walk(&mut self, ctx: &mut BuildContext<'_, '_>, first: Option<RecordOffset>, buckets: &[RowId; 4])
    {
        let source = ctx.names.source();
        let mut stack: Vec<Pending> = first.map(|offset| Pending { offset, parent: None }).into_iter().collect();

        while let Some(Pending { offset, parent }) = stack.pop() {
            if ctx.index.offsets.contains(offset) {
                warn!(offset, "record reached twice, skipping branch");
                continue;
            }
            let Some(record) = source.record(offset) else {
                warn!(offset, "record unreadable, skipping branch");
                continue;
            };

            let row_parent = parent.unwrap_or_else(|| buckets[tables::classify(record.tag).position()]);
            let row = self.emit(ctx, Some(row_parent), &record);

            if let Some(sibling) = record.next_sibling {
                stack.push(Pending { offset: sibling, parent });
            }
            if let Some(child) = record.first_child {
                stack.push(Pending {
                    offset: child,
                    parent: Some(row),
                });
            }
        }
    }

    fn emit(&mut self, ctx: &mut BuildContext<'_, '_>, parent: Option<RowId>, record: &Record) -> RowId
    {
        let name = ctx.names.resolve(record);
        let marker = if record.tag == gimli::constants::DW_TAG_imported_declaration {
            DeclMarker::Imported
        } else if record.is_declaration() {
            DeclMarker::Declaration
        } else {
            DeclMarker::None
        };

        let row = ctx.sink.append(
            parent,
            RowData {
                offset: Some(record.offset),
                label: tables::tag_name(record.tag).to_string(),
                name: name.clone(),
                marker,
            },
        );
        ctx.index.offsets.insert(record.offset, row);
        self.records += 1;

        if name != NO_NAME {
            let list = match tables::classify(record.tag) {
                RecordClass::Function => Some(&mut ctx.index.functions),
                RecordClass::Variable => Some(&mut ctx.index.variables),
                RecordClass::Type | RecordClass::Other => None,
            };
            if let Some(list) = list {
                list.push(NameEntry {
                    name,
                    row,
                    offset: record.offset,
                    declaration: marker == DeclMarker::Declaration,
                });
            }
        }
        row
    }
}
