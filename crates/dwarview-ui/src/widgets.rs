//! Widget components for the tree, attribute and search panes

use dwarview_core::tree::DeclMarker;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table};
use ratatui::Frame;

use crate::app::{App, Focus};

fn pane(title: String, focused: bool) -> Block<'static>
{
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default().borders(Borders::ALL).border_style(style).title(title)
}

fn header_cell(text: &'static str) -> Cell<'static>
{
    Cell::from(text).style(Style::default().add_modifier(Modifier::BOLD))
}

/// First row of a `height`-row window that keeps `selected` visible.
fn window_start(selected: usize, len: usize, height: usize) -> usize
{
    if height == 0 || len <= height {
        return 0;
    }
    selected.saturating_sub(height / 2).min(len - height)
}

/// Draw the record tree
///
/// Only the rows that fit the pane are turned into list items.
pub fn draw_tree(frame: &mut Frame, area: Rect, app: &mut App)
{
    let rows = app.visible_rows();
    let block = pane(
        format!("Records ({})", app.session().map_or(0, |s| s.tree().len())),
        app.focus == Focus::Tree,
    );
    let Some(session) = app.session() else {
        frame.render_widget(Paragraph::new("No image loaded").block(block), area);
        return;
    };

    let selected = app.tree_state.selected().map(|index| index.min(rows.len().saturating_sub(1)));
    let height = usize::from(area.height.saturating_sub(2));
    let start = window_start(selected.unwrap_or(0), rows.len(), height);

    let items: Vec<ListItem> = rows
        .iter()
        .skip(start)
        .take(height)
        .filter_map(|row| {
            let data = session.tree().data(row.id)?;
            let marker = match (row.expandable, row.expanded) {
                (false, _) => " ",
                (true, false) => "▸",
                (true, true) => "▾",
            };
            let style = if data.is_bucket() {
                Style::default().fg(Color::Yellow)
            } else if data.marker == DeclMarker::Imported {
                Style::default().add_modifier(Modifier::DIM)
            } else {
                Style::default()
            };
            Some(ListItem::new(Line::from(vec![
                Span::raw(format!("{}{marker} ", "  ".repeat(row.depth))),
                Span::styled(format!("{} ", data.label), Style::default().fg(Color::DarkGray)),
                Span::styled(data.display_name(), style),
            ])))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    let mut window = ListState::default();
    window.select(selected.map(|index| index - start));
    app.tree_state.select(selected);
    frame.render_stateful_widget(list, area, &mut window);
}

/// Draw the attribute table of the active row
pub fn draw_attributes(frame: &mut Frame, area: Rect, app: &mut App)
{
    let title = app
        .active_row
        .and_then(|row| app.session()?.tree().data(row))
        .map_or_else(|| "Attributes".to_string(), |data| format!("Attributes: {}", data.display_name()));

    let rows: Vec<Row> = app
        .attributes
        .iter()
        .map(|attribute| {
            let style = if attribute.reference.is_some() {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(attribute.attr),
                Cell::from(attribute.form),
                Cell::from(format!("{:#x}", attribute.value)),
                Cell::from(attribute.text.clone()),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(rows, [
        Constraint::Length(22),
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Min(0),
    ])
    .block(pane(title, app.focus == Focus::Attributes))
    .header(Row::new(vec![
        header_cell("Attribute"),
        header_cell("Form"),
        header_cell("Value"),
        header_cell("Text"),
    ]))
    .row_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    .highlight_symbol(">> ");

    frame.render_stateful_widget(table, area, &mut app.attributes_state);
}

/// Draw the search results
pub fn draw_results(frame: &mut Frame, area: Rect, app: &mut App)
{
    let Some(session) = app.workspace.session() else {
        frame.render_widget(pane("Search".to_string(), app.focus == Focus::Results), area);
        return;
    };

    let hits = session.search_results();
    let title = format!("Search: {} ({} found)", app.last_pattern(), hits.len());
    let rows: Vec<Row> = hits
        .iter()
        .map(|hit| Row::new(vec![Cell::from(hit.name.clone()), Cell::from(hit.location.clone())]))
        .collect();

    let table = Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
        .block(pane(title, app.focus == Focus::Results))
        .header(Row::new(vec![header_cell("Name"), header_cell("Location")]))
        .row_highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    frame.render_stateful_widget(table, area, &mut app.results_state);
}

/// Draw the search prompt over the main area
pub fn draw_search_prompt(frame: &mut Frame, area: Rect, app: &App)
{
    let Some(prompt) = &app.prompt else {
        return;
    };

    let [_, middle, _] = Layout::vertical([Constraint::Fill(1), Constraint::Length(5), Constraint::Fill(1)]).areas(area);
    let [_, popup, _] = Layout::horizontal([
        Constraint::Percentage(20),
        Constraint::Percentage(60),
        Constraint::Percentage(20),
    ])
    .areas(middle);

    let lines = vec![
        Line::from(vec![
            Span::styled("Pattern: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}_", prompt.pattern)),
        ]),
        Line::from(vec![
            Span::styled("Scope: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{:<12}", prompt.scope.to_string())),
            Span::styled("Declarations: ", Style::default().fg(Color::Yellow)),
            Span::raw(if prompt.include_declarations { "yes" } else { "no" }),
        ]),
    ];

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Search"),
    );

    frame.render_widget(Clear, popup);
    frame.render_widget(widget, popup);
}
