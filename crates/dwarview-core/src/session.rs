//! # Session
//!
//! Everything that belongs to one open image: the record source, the display
//! tree and its indices, the running build and the search engine. A host
//! drives a [`Session`] by calling [`Session::step`] from its event loop until
//! it reports [`Activity::Idle`].
//!
//! [`Workspace`] holds at most one session and swaps it out only when a new
//! image opened successfully.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::builder::{BuildContext, BuildProgress, TreeBuilder};
use crate::decode::{DecodedAttribute, ValueDecoder};
use crate::demangle::{Demangler, DemanglerKind};
use crate::error::Result;
use crate::index::DisplayIndex;
use crate::names::NameResolver;
use crate::search::{SearchEngine, SearchHit, SearchRequest, SearchStatus, StartOutcome};
use crate::source::{AttrValue, DwarfImage, Record, RecordOffset, RecordSource};
use crate::tree::{RowId, TreeModel};

/// Tunables of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions
{
    /// Names scanned per search step
    pub search_batch: usize,
    /// Records visited on an origin/specification chain
    pub max_chase_steps: usize,
    /// Type references followed when describing a type
    pub max_type_depth: usize,
}

impl Default for SessionOptions
{
    fn default() -> Self
    {
        Self {
            search_batch: 1000,
            max_chase_steps: 16,
            max_type_depth: 32,
        }
    }
}

/// Whether a session has more work queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity
{
    Busy,
    Idle,
}

/// Status channel a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusContext
{
    Build,
    Search,
}

/// Latest status message per context.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard
{
    build: Option<String>,
    search: Option<String>,
}

impl StatusBoard
{
    pub fn set(&mut self, context: StatusContext, message: impl Into<String>)
    {
        let message = message.into();
        debug!(?context, %message, "status");
        *self.slot(context) = Some(message);
    }

    pub fn clear(&mut self, context: StatusContext)
    {
        *self.slot(context) = None;
    }

    #[must_use]
    pub fn get(&self, context: StatusContext) -> Option<&str>
    {
        match context {
            StatusContext::Build => self.build.as_deref(),
            StatusContext::Search => self.search.as_deref(),
        }
    }

    fn slot(&mut self, context: StatusContext) -> &mut Option<String>
    {
        match context {
            StatusContext::Build => &mut self.build,
            StatusContext::Search => &mut self.search,
        }
    }
}

/// State of one open image.
pub struct Session
{
    source: Box<dyn RecordSource>,
    demangler: Box<dyn Demangler>,
    options: SessionOptions,
    tree: TreeModel,
    index: DisplayIndex,
    builder: TreeBuilder,
    search: SearchEngine,
    status: StatusBoard,
}

impl Session
{
    #[must_use]
    pub fn new(source: Box<dyn RecordSource>, demangler: Box<dyn Demangler>, options: SessionOptions) -> Self
    {
        let builder = TreeBuilder::new(source.section_size());
        let mut status = StatusBoard::default();
        status.set(StatusContext::Build, "Loading...");
        Self {
            source,
            demangler,
            options,
            tree: TreeModel::new(),
            index: DisplayIndex::default(),
            builder,
            search: SearchEngine::new(options.search_batch),
            status,
        }
    }

    /// Do one bounded unit of work.
    ///
    /// Builds the next unit while the tree is incomplete, otherwise scans the
    /// next batch of a running search.
    pub fn step(&mut self) -> Activity
    {
        if !self.builder.is_done() {
            let names = NameResolver::new(
                self.source.as_ref(),
                self.demangler.as_ref(),
                self.options.max_chase_steps,
                self.options.max_type_depth,
            );
            let mut ctx = BuildContext {
                names: &names,
                sink: &mut self.tree,
                index: &mut self.index,
            };
            let progress = self.builder.advance(&mut ctx);
            self.status.set(StatusContext::Build, build_message(&progress));
        } else if self.search.is_active() {
            let status = self.search.step(&self.index, self.source.as_ref());
            self.status.set(StatusContext::Search, status.to_string());
        }

        if self.builder.is_done() && !self.search.is_active() {
            Activity::Idle
        } else {
            Activity::Busy
        }
    }

    /// Step until idle.
    pub fn run_to_idle(&mut self)
    {
        while self.step() == Activity::Busy {}
    }

    /// Decoded attribute table of a row; `None` for bucket rows.
    #[must_use]
    pub fn attributes(&self, row: RowId) -> Option<Vec<DecodedAttribute>>
    {
        let record = self.row_record(row)?;
        let names = self.resolver();
        Some(ValueDecoder::new(&names).decode_all(&record))
    }

    /// Row of the record referenced by attribute `attr_index` of `row`.
    ///
    /// `None` when the attribute is not a reference or the target row has not
    /// been emitted (yet).
    #[must_use]
    pub fn follow(&self, row: RowId, attr_index: usize) -> Option<RowId>
    {
        let record = self.row_record(row)?;
        match record.attributes.get(attr_index)?.value {
            AttrValue::Reference(target) => self.row_for_offset(target),
            _ => None,
        }
    }

    /// Row showing the record at `offset`.
    #[must_use]
    pub fn row_for_offset(&self, offset: RecordOffset) -> Option<RowId>
    {
        self.index.offsets.get(offset)
    }

    fn row_record(&self, row: RowId) -> Option<Record>
    {
        let offset = self.tree.data(row)?.offset?;
        let record = self.source.record(offset);
        if record.is_none() {
            warn!(offset, "row refers to an unreadable record");
        }
        record
    }

    /// Start a search; see [`SearchEngine::start`].
    ///
    /// ## Errors
    ///
    /// Propagates [`SearchEngine::start`] errors.
    pub fn start_search(&mut self, request: SearchRequest) -> Result<StartOutcome>
    {
        let outcome = self.search.start(request)?;
        if outcome == StartOutcome::Started {
            self.status.set(StatusContext::Search, self.search.status().to_string());
        }
        Ok(outcome)
    }

    /// Ask the running search to stop on its next step.
    pub fn cancel_search(&mut self)
    {
        self.search.cancel();
    }

    /// Stop the running search now.
    pub fn stop_search(&mut self)
    {
        self.search.stop();
        self.status.set(StatusContext::Search, self.search.status().to_string());
    }

    /// Drop displayed results.
    pub fn clear_search(&mut self)
    {
        self.search.clear_results();
        self.status.clear(StatusContext::Search);
    }

    #[must_use]
    pub fn search_results(&self) -> &[SearchHit]
    {
        self.search.results()
    }

    #[must_use]
    pub fn search_status(&self) -> SearchStatus
    {
        self.search.status()
    }

    #[must_use]
    pub fn build_progress(&self) -> BuildProgress
    {
        self.builder.progress()
    }

    #[must_use]
    pub fn tree(&self) -> &TreeModel
    {
        &self.tree
    }

    #[must_use]
    pub fn index(&self) -> &DisplayIndex
    {
        &self.index
    }

    #[must_use]
    pub fn status(&self) -> &StatusBoard
    {
        &self.status
    }

    #[must_use]
    pub fn source(&self) -> &dyn RecordSource
    {
        self.source.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> SessionOptions
    {
        self.options
    }

    /// Name resolver over this session's image.
    #[must_use]
    pub fn resolver(&self) -> NameResolver<'_>
    {
        NameResolver::new(
            self.source.as_ref(),
            self.demangler.as_ref(),
            self.options.max_chase_steps,
            self.options.max_type_depth,
        )
    }
}

fn build_message(progress: &BuildProgress) -> String
{
    if progress.done {
        format!("Loaded {} units, {} records", progress.units, progress.records)
    } else {
        format!("Loading... {}% ({} units)", progress.percent(), progress.units)
    }
}

/// Holder of the single open session.
pub struct Workspace
{
    options: SessionOptions,
    demangler: DemanglerKind,
    session: Option<Session>,
    path: Option<PathBuf>,
}

impl Workspace
{
    #[must_use]
    pub fn new(options: SessionOptions, demangler: DemanglerKind) -> Self
    {
        Self {
            options,
            demangler,
            session: None,
            path: None,
        }
    }

    /// Open an image file, replacing the current session on success.
    ///
    /// ## Errors
    ///
    /// Returns the error of [`DwarfImage::open`]; the current session is left
    /// untouched.
    pub fn open(&mut self, path: &Path) -> Result<()>
    {
        let image = DwarfImage::open(path)?;
        self.install(Box::new(image), Some(path.to_path_buf()));
        Ok(())
    }

    /// Replace the current session with one over an already loaded source.
    pub fn open_source(&mut self, source: Box<dyn RecordSource>)
    {
        self.install(source, None);
    }

    fn install(&mut self, source: Box<dyn RecordSource>, path: Option<PathBuf>)
    {
        self.close();
        info!(path = ?path, "session opened");
        self.session = Some(Session::new(source, self.demangler.create(), self.options));
        self.path = path;
    }

    /// Drop the current session and everything indexed for it.
    pub fn close(&mut self)
    {
        if let Some(mut session) = self.session.take() {
            session.stop_search();
            info!(path = ?self.path, "session closed");
        }
        self.path = None;
    }

    /// Move the current session out, leaving the workspace empty.
    pub fn take_session(&mut self) -> Option<Session>
    {
        self.path = None;
        self.session.take()
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session>
    {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session>
    {
        self.session.as_mut()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path>
    {
        self.path.as_deref()
    }
}
