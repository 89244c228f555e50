//! # Name Search
//!
//! Glob search over the name lists filled by the tree builder, run in bounded
//! batches so a host can interleave it with input handling.
//!
//! ## Lifecycle
//!
//! [`SearchEngine::start`] creates a running search, [`SearchEngine::step`]
//! scans up to one batch of names, and the search ends on its own once every
//! selected list has been scanned. [`SearchEngine::cancel`] asks the next step
//! to stop; [`SearchEngine::stop`] stops at once. Hits found before a stop or
//! cancel stay in the result list.
//!
//! ## Order
//!
//! Each list is scanned newest entry first. With [`SearchScope::Both`] the
//! function list is scanned completely before the variable list.

use std::fmt;

use gimli::constants;
use regex::Regex;
use tracing::{debug, info};

use crate::decode;
use crate::error::{DwarviewError, Result};
use crate::index::{DisplayIndex, NameList};
use crate::names::chase_target;
use crate::source::{RecordOffset, RecordSource};
use crate::tree::RowId;

/// Location shown for hits whose declaration site is not recorded.
pub const UNKNOWN_LOCATION: &str = "(unknown)";

/// Records visited looking for a declaration site.
const LOCATION_CHASE_STEPS: usize = 16;

/// Shell-style glob compiled for whole-string matching.
///
/// `*` matches any run of characters, `?` one character, `[...]` a class
/// (`[!...]` or `[^...]` negated) and `\` escapes the next character.
/// Matching is case-sensitive.
///
/// ```rust
/// use dwarview_core::search::GlobPattern;
///
/// let glob = GlobPattern::new("str*cpy").unwrap();
/// assert!(glob.matches("strncpy"));
/// assert!(!glob.matches("my_strcpy"));
/// ```
#[derive(Debug, Clone)]
pub struct GlobPattern
{
    source: String,
    regex: Regex,
}

impl GlobPattern
{
    /// Compile a glob.
    ///
    /// ## Errors
    ///
    /// Returns [`DwarviewError::InvalidPattern`] for an empty pattern, an
    /// unterminated class or a class the regex engine rejects (such as `[z-a]`).
    pub fn new(glob: &str) -> Result<Self>
    {
        if glob.is_empty() {
            return Err(DwarviewError::InvalidPattern("empty pattern".to_string()));
        }
        let translated = translate(glob)?;
        let regex = Regex::new(&translated).map_err(|err| DwarviewError::InvalidPattern(format!("{glob}: {err}")))?;
        Ok(Self {
            source: glob.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str
    {
        &self.source
    }

    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool
    {
        self.regex.is_match(candidate)
    }
}

/// Translate a glob into an anchored regular expression.
fn translate(glob: &str) -> Result<String>
{
    let mut out = String::from("^");
    let mut chars = glob.chars();

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4]))),
                None => out.push_str(r"\\"),
            },
            '[' => {
                out.push('[');
                let mut rest = chars.clone().peekable();
                if matches!(rest.peek(), Some('!' | '^')) {
                    out.push('^');
                    chars.next();
                }
                let mut first = true;
                let mut closed = false;
                for member in chars.by_ref() {
                    match member {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '\\' | '[' | ']' | '^' | '&' | '~' => {
                            out.push('\\');
                            out.push(member);
                        }
                        _ => out.push(member),
                    }
                    first = false;
                }
                if !closed {
                    return Err(DwarviewError::InvalidPattern(format!("{glob}: unterminated character class")));
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push('$');
    Ok(out)
}

/// Which name lists a search covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SearchScope
{
    Functions,
    Variables,
    #[default]
    Both,
}

impl SearchScope
{
    /// Next scope in `Functions -> Variables -> Both` order.
    #[must_use]
    pub const fn next(self) -> Self
    {
        match self {
            SearchScope::Functions => SearchScope::Variables,
            SearchScope::Variables => SearchScope::Both,
            SearchScope::Both => SearchScope::Functions,
        }
    }

    const fn includes_functions(self) -> bool
    {
        matches!(self, SearchScope::Functions | SearchScope::Both)
    }

    const fn includes_variables(self) -> bool
    {
        matches!(self, SearchScope::Variables | SearchScope::Both)
    }
}

impl fmt::Display for SearchScope
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            SearchScope::Functions => "functions",
            SearchScope::Variables => "variables",
            SearchScope::Both => "both",
        })
    }
}

/// Parameters of one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest
{
    pub pattern: String,
    pub scope: SearchScope,
    pub include_declarations: bool,
}

impl SearchRequest
{
    #[must_use]
    pub fn new(pattern: impl Into<String>, scope: SearchScope) -> Self
    {
        Self {
            pattern: pattern.into(),
            scope,
            include_declarations: false,
        }
    }

    #[must_use]
    pub fn with_declarations(mut self, include: bool) -> Self
    {
        self.include_declarations = include;
        self
    }
}

/// One match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit
{
    pub name: String,
    /// `file:line` of the declaration
    pub location: String,
    pub row: RowId,
    pub offset: RecordOffset,
}

/// Where the engine stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus
{
    Idle,
    Running
    {
        /// Names scanned so far
        scanned: usize,
        /// Names in the selected lists
        total: usize,
        found: usize,
    },
    Done
    {
        found: usize,
    },
    /// Stopped early; hits found before the stop are kept
    Canceled
    {
        found: usize,
    },
}

impl SearchStatus
{
    #[must_use]
    pub fn is_running(&self) -> bool
    {
        matches!(self, SearchStatus::Running { .. })
    }
}

impl fmt::Display for SearchStatus
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SearchStatus::Idle => Ok(()),
            SearchStatus::Running { scanned, total, found } => {
                write!(f, "Searching... {scanned}/{total} ({found} found)")
            }
            SearchStatus::Done { found } => write!(f, "Done ({found} found)"),
            SearchStatus::Canceled { .. } => f.write_str("Canceled"),
        }
    }
}

/// Result of [`SearchEngine::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome
{
    Started,
    /// Same request as the results on display; nothing was started
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase
{
    Functions,
    Variables,
}

#[derive(Debug)]
struct ActiveSearch
{
    request: SearchRequest,
    glob: GlobPattern,
    phase: Phase,
    position: usize,
    scanned: usize,
}

/// Incremental, cancelable name search.
#[derive(Debug)]
pub struct SearchEngine
{
    batch: usize,
    active: Option<ActiveSearch>,
    cancel_requested: bool,
    results: Vec<SearchHit>,
    shown: Option<SearchRequest>,
    status: SearchStatus,
}

impl SearchEngine
{
    /// Create an engine scanning at most `batch` names per step.
    #[must_use]
    pub fn new(batch: usize) -> Self
    {
        Self {
            batch: batch.max(1),
            active: None,
            cancel_requested: false,
            results: Vec::new(),
            shown: None,
            status: SearchStatus::Idle,
        }
    }

    /// Begin a search.
    ///
    /// ## Errors
    ///
    /// - [`DwarviewError::SearchBusy`] while another search is running
    /// - [`DwarviewError::InvalidPattern`] if the pattern does not compile
    pub fn start(&mut self, request: SearchRequest) -> Result<StartOutcome>
    {
        if self.active.is_some() {
            return Err(DwarviewError::SearchBusy);
        }
        if self.shown.as_ref() == Some(&request) {
            debug!(pattern = %request.pattern, "search unchanged");
            return Ok(StartOutcome::Unchanged);
        }

        let glob = GlobPattern::new(&request.pattern)?;
        let phase = if request.scope.includes_functions() {
            Phase::Functions
        } else {
            Phase::Variables
        };
        debug!(pattern = %request.pattern, scope = %request.scope, "search started");

        self.results.clear();
        self.shown = None;
        self.cancel_requested = false;
        self.status = SearchStatus::Running {
            scanned: 0,
            total: 0,
            found: 0,
        };
        self.active = Some(ActiveSearch {
            request,
            glob,
            phase,
            position: 0,
            scanned: 0,
        });
        Ok(StartOutcome::Started)
    }

    /// Scan up to one batch of names.
    pub fn step(&mut self, index: &DisplayIndex, source: &dyn RecordSource) -> SearchStatus
    {
        if self.active.is_none() {
            return self.status;
        }
        if self.cancel_requested {
            self.finish_canceled();
            return self.status;
        }

        let batch = self.batch;
        let Some(search) = self.active.as_mut() else {
            return self.status;
        };
        let total = scope_total(index, search.request.scope);
        let mut budget = batch;
        let mut finished = false;

        while budget > 0 {
            let list = match search.phase {
                Phase::Functions => &index.functions,
                Phase::Variables => &index.variables,
            };
            let Some(entry) = list.recent(search.position) else {
                if search.phase == Phase::Functions && search.request.scope.includes_variables() {
                    search.phase = Phase::Variables;
                    search.position = 0;
                    continue;
                }
                finished = true;
                break;
            };

            search.position += 1;
            search.scanned += 1;
            budget -= 1;

            if entry.declaration && !search.request.include_declarations {
                continue;
            }
            if search.glob.matches(&entry.name) {
                self.results.push(SearchHit {
                    name: entry.name.clone(),
                    location: declared_location(source, entry.offset),
                    row: entry.row,
                    offset: entry.offset,
                });
            }
        }

        let scanned = search.scanned;
        if finished {
            if let Some(search) = self.active.take() {
                info!(pattern = search.glob.as_str(), found = self.results.len(), "search finished");
                self.shown = Some(search.request);
            }
            self.status = SearchStatus::Done {
                found: self.results.len(),
            };
        } else {
            self.status = SearchStatus::Running {
                scanned,
                total,
                found: self.results.len(),
            };
        }
        self.status
    }

    /// Ask the running search to stop at the next step.
    pub fn cancel(&mut self)
    {
        if self.active.is_some() {
            self.cancel_requested = true;
        }
    }

    /// Stop the running search now.
    pub fn stop(&mut self)
    {
        if self.active.is_some() {
            self.finish_canceled();
        }
    }

    fn finish_canceled(&mut self)
    {
        self.active = None;
        self.cancel_requested = false;
        self.shown = None;
        self.status = SearchStatus::Canceled {
            found: self.results.len(),
        };
        info!(found = self.results.len(), "search canceled");
    }

    #[must_use]
    pub fn is_active(&self) -> bool
    {
        self.active.is_some()
    }

    #[must_use]
    pub fn status(&self) -> SearchStatus
    {
        self.status
    }

    #[must_use]
    pub fn results(&self) -> &[SearchHit]
    {
        &self.results
    }

    /// Forget the displayed results so the same request can run again.
    pub fn clear_results(&mut self)
    {
        self.results.clear();
        self.shown = None;
        if self.active.is_none() {
            self.status = SearchStatus::Idle;
        }
    }
}

fn scope_total(index: &DisplayIndex, scope: SearchScope) -> usize
{
    let count = |include: bool, list: &NameList| if include { list.len() } else { 0 };
    count(scope.includes_functions(), &index.functions) + count(scope.includes_variables(), &index.variables)
}

/// `file:line` where the record at `offset` was declared.
///
/// Follows the same origin and specification references as name resolution
/// until a record with `decl_file` turns up.
#[must_use]
pub fn declared_location(source: &dyn RecordSource, offset: RecordOffset) -> String
{
    let mut next = Some(offset);
    for _ in 0..LOCATION_CHASE_STEPS {
        let Some(record) = next.and_then(|offset| source.record(offset)) else {
            break;
        };
        if let Some(file) = record.attr(constants::DW_AT_decl_file).and_then(|attr| attr.udata_value()) {
            let file = decode::file_name(source.unit_info(record.unit), file);
            return match record.attr(constants::DW_AT_decl_line).and_then(|attr| attr.udata_value()) {
                Some(line) => format!("{file}:{line}"),
                None => file,
            };
        }
        next = chase_target(&record);
    }
    UNKNOWN_LOCATION.to_string()
}
