//! Application state and logic

use std::collections::HashSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use dwarview_core::decode::DecodedAttribute;
use dwarview_core::search::{SearchRequest, SearchScope, StartOutcome};
use dwarview_core::tree::RowId;
use dwarview_core::{Activity, Session, Workspace};
use dwarview_utils::debug;
use ratatui::widgets::{ListState, TableState};

/// Rows moved by PageUp/PageDown.
const PAGE: usize = 20;

/// Pane that receives navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus
{
    /// Record tree
    Tree,
    /// Attribute table of the active row
    Attributes,
    /// Search results
    Results,
}

impl Focus
{
    const fn next(self) -> Self
    {
        match self {
            Focus::Tree => Focus::Attributes,
            Focus::Attributes => Focus::Results,
            Focus::Results => Focus::Tree,
        }
    }

    const fn previous(self) -> Self
    {
        match self {
            Focus::Tree => Focus::Results,
            Focus::Attributes => Focus::Tree,
            Focus::Results => Focus::Attributes,
        }
    }
}

/// Contents of the search prompt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPrompt
{
    pub pattern: String,
    pub scope: SearchScope,
    pub include_declarations: bool,
}

impl SearchPrompt
{
    fn request(&self) -> SearchRequest
    {
        SearchRequest::new(self.pattern.clone(), self.scope).with_declarations(self.include_declarations)
    }
}

/// A tree row as currently laid out on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRow
{
    pub id: RowId,
    pub depth: usize,
    pub expandable: bool,
    pub expanded: bool,
}

/// Application state
pub struct App
{
    /// Holder of the open image
    pub workspace: Workspace,
    /// Whether the application should exit
    pub should_quit: bool,
    /// Pane receiving navigation keys
    pub focus: Focus,
    /// Selection in the flattened visible tree
    pub tree_state: ListState,
    /// Row whose attributes are shown
    pub active_row: Option<RowId>,
    /// Decoded attributes of `active_row`
    pub attributes: Vec<DecodedAttribute>,
    pub attributes_state: TableState,
    pub results_state: TableState,
    /// Open search prompt, if any
    pub prompt: Option<SearchPrompt>,
    /// Message shown in the footer until the next key press
    pub error_message: Option<String>,
    expanded: HashSet<RowId>,
    last_search: SearchPrompt,
}

impl App
{
    /// Create a new application instance
    #[must_use]
    pub fn new(workspace: Workspace) -> Self
    {
        Self {
            workspace,
            should_quit: false,
            focus: Focus::Tree,
            tree_state: ListState::default(),
            active_row: None,
            attributes: Vec::new(),
            attributes_state: TableState::default(),
            results_state: TableState::default(),
            prompt: None,
            error_message: None,
            expanded: HashSet::new(),
            last_search: SearchPrompt::default(),
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session>
    {
        self.workspace.session()
    }

    /// Advance the session by one step and keep selections in range.
    pub fn step(&mut self) -> Activity
    {
        let activity = self.workspace.session_mut().map_or(Activity::Idle, Session::step);

        if self.tree_state.selected().is_none() && self.session().is_some_and(|s| !s.tree().is_empty()) {
            self.tree_state.select(Some(0));
        }
        let results = self.session().map_or(0, |s| s.search_results().len());
        if results == 0 {
            self.results_state.select(None);
        } else if self.results_state.selected().is_none() {
            self.results_state.select(Some(0));
        }
        activity
    }

    /// Tree rows in display order, descending only into expanded rows.
    ///
    /// Every row starts collapsed.
    #[must_use]
    pub fn visible_rows(&self) -> Vec<VisibleRow>
    {
        let Some(session) = self.session() else {
            return Vec::new();
        };
        let tree = session.tree();
        let mut rows = Vec::new();
        let mut stack: Vec<(RowId, usize)> = tree.roots().iter().rev().map(|id| (*id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let children = tree.children(id);
            let expanded = self.expanded.contains(&id);
            rows.push(VisibleRow {
                id,
                depth,
                expandable: !children.is_empty(),
                expanded,
            });
            if expanded {
                stack.extend(children.iter().rev().map(|child| (*child, depth + 1)));
            }
        }
        rows
    }

    /// Row under the tree cursor
    #[must_use]
    pub fn selected_row(&self) -> Option<RowId>
    {
        let index = self.tree_state.selected()?;
        self.visible_rows().get(index).map(|row| row.id)
    }

    /// Pattern of the last submitted search
    #[must_use]
    pub fn last_pattern(&self) -> &str
    {
        &self.last_search.pattern
    }

    #[must_use]
    pub fn search_running(&self) -> bool
    {
        self.session().is_some_and(|s| s.search_status().is_running())
    }

    /// Handle a keyboard event
    ///
    /// Returns `true` if the application should quit, `false` otherwise.
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> bool
    {
        if self.prompt.is_some() {
            self.handle_prompt_key(key_event);
            return false;
        }

        self.error_message = None;
        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);

        match key_event.code {
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('q' | 'Q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.search_running() {
                    if let Some(session) = self.workspace.session_mut() {
                        session.cancel_search();
                    }
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('/') => self.prompt = Some(self.last_search.clone()),
            KeyCode::Char('x') => {
                if let Some(session) = self.workspace.session_mut() {
                    session.clear_search();
                }
                self.results_state.select(None);
            }
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(|i, len| if i == 0 { len - 1 } else { i - 1 }),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(|i, len| if i + 1 >= len { 0 } else { i + 1 }),
            KeyCode::PageUp => self.move_selection(|i, _| i.saturating_sub(PAGE)),
            KeyCode::PageDown => self.move_selection(|i, len| (i + PAGE).min(len - 1)),
            KeyCode::Home => self.move_selection(|_, _| 0),
            KeyCode::End => self.move_selection(|_, len| len - 1),
            KeyCode::Right | KeyCode::Char('l') => self.set_expanded(true),
            KeyCode::Left | KeyCode::Char('h') => self.collapse_or_parent(),
            KeyCode::Char(' ') => self.toggle_expanded(),
            KeyCode::Enter => self.enter(),
            _ => {}
        }

        self.should_quit
    }

    fn handle_prompt_key(&mut self, key_event: KeyEvent)
    {
        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };

        match key_event.code {
            KeyCode::Esc => {
                self.prompt = None;
                if let Some(session) = self.workspace.session_mut() {
                    session.cancel_search();
                }
            }
            KeyCode::Enter => self.submit_search(),
            KeyCode::Tab => prompt.scope = prompt.scope.next(),
            KeyCode::Char('d') if ctrl => prompt.include_declarations = !prompt.include_declarations,
            KeyCode::Char('u') if ctrl => prompt.pattern.clear(),
            KeyCode::Backspace => {
                prompt.pattern.pop();
            }
            KeyCode::Char(c) if !ctrl => prompt.pattern.push(c),
            _ => {}
        }
    }

    fn submit_search(&mut self)
    {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let request = prompt.request();
        self.last_search = prompt;

        let Some(session) = self.workspace.session_mut() else {
            return;
        };
        match session.start_search(request) {
            Ok(StartOutcome::Started) => {
                self.results_state.select(None);
                self.focus = Focus::Results;
            }
            Ok(StartOutcome::Unchanged) => {
                debug!("Search request unchanged, keeping results");
                self.focus = Focus::Results;
            }
            Err(err) => {
                self.error_message = Some(err.to_string());
                self.prompt = Some(self.last_search.clone());
            }
        }
    }

    /// Move the cursor of the focused pane; `next` maps (index, len) to the new index.
    fn move_selection(&mut self, next: impl Fn(usize, usize) -> usize)
    {
        match self.focus {
            Focus::Tree => {
                let len = self.visible_rows().len();
                if len == 0 {
                    return;
                }
                let current = self.tree_state.selected().unwrap_or(0).min(len - 1);
                self.tree_state.select(Some(next(current, len)));
                if let Some(row) = self.selected_row() {
                    self.activate(row);
                }
            }
            Focus::Attributes => {
                let len = self.attributes.len();
                if len > 0 {
                    let current = self.attributes_state.selected().unwrap_or(0).min(len - 1);
                    self.attributes_state.select(Some(next(current, len)));
                }
            }
            Focus::Results => {
                let len = self.session().map_or(0, |s| s.search_results().len());
                if len > 0 {
                    let current = self.results_state.selected().unwrap_or(0).min(len - 1);
                    self.results_state.select(Some(next(current, len)));
                }
            }
        }
    }

    fn set_expanded(&mut self, expand: bool)
    {
        if self.focus != Focus::Tree {
            return;
        }
        if let Some(row) = self.selected_row() {
            if expand {
                self.expanded.insert(row);
            } else {
                self.expanded.remove(&row);
            }
        }
    }

    fn toggle_expanded(&mut self)
    {
        if let Some(row) = self.selected_row() {
            let expand = !self.expanded.contains(&row);
            self.set_expanded(expand);
        }
    }

    /// Collapse the selected row, or move to its parent when already collapsed.
    fn collapse_or_parent(&mut self)
    {
        if self.focus != Focus::Tree {
            return;
        }
        let Some(row) = self.selected_row() else {
            return;
        };
        if self.expanded.remove(&row) {
            return;
        }
        if let Some(parent) = self.session().and_then(|s| s.tree().parent(row)) {
            self.jump_to(parent);
        }
    }

    fn enter(&mut self)
    {
        match self.focus {
            Focus::Tree => {
                if let Some(row) = self.selected_row() {
                    self.activate(row);
                    self.toggle_expanded();
                }
            }
            Focus::Attributes => self.follow_selected_attribute(),
            Focus::Results => {
                let target = self
                    .results_state
                    .selected()
                    .and_then(|index| self.session()?.search_results().get(index).map(|hit| hit.row));
                if let Some(row) = target {
                    self.jump_to(row);
                }
            }
        }
    }

    /// Show the attributes of `row`.
    pub fn activate(&mut self, row: RowId)
    {
        self.active_row = Some(row);
        self.attributes = self.session().and_then(|s| s.attributes(row)).unwrap_or_default();
        self.attributes_state
            .select(if self.attributes.is_empty() { None } else { Some(0) });
    }

    fn follow_selected_attribute(&mut self)
    {
        let (Some(row), Some(index)) = (self.active_row, self.attributes_state.selected()) else {
            return;
        };
        let target = self.session().and_then(|s| s.follow(row, index));
        match (target, self.attributes.get(index)) {
            (Some(target), _) => self.jump_to(target),
            (None, Some(attribute)) => {
                self.error_message = Some(match attribute.reference {
                    Some(offset) => format!("Record {offset:#x} is not in the tree"),
                    None => format!("{} is not a reference", attribute.attr),
                });
            }
            (None, None) => {}
        }
    }

    /// Expand the ancestors of `row`, select it in the tree and show its attributes.
    pub fn jump_to(&mut self, row: RowId)
    {
        let Some(session) = self.session() else {
            return;
        };
        let ancestors = session.tree().ancestors(row);
        self.expanded.extend(ancestors);
        if let Some(position) = self.visible_rows().iter().position(|visible| visible.id == row) {
            self.tree_state.select(Some(position));
        }
        self.focus = Focus::Tree;
        self.activate(row);
    }
}
