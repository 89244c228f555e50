//! UI rendering logic

use dwarview_core::StatusContext;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, Focus};

/// Draw the UI
pub fn draw(frame: &mut Frame, app: &mut App)
{
    let footer_height = if app.error_message.is_some() { 5 } else { 4 };
    let chunks = Layout::vertical([
        Constraint::Length(3),             // Header
        Constraint::Min(0),                // Tree, attributes, results
        Constraint::Length(footer_height), // Status and help
    ])
    .split(frame.area());

    draw_header(frame, chunks[0], app);
    draw_main_content(frame, chunks[1], app);
    draw_footer(frame, chunks[2], app);

    if app.prompt.is_some() {
        crate::widgets::draw_search_prompt(frame, chunks[1], app);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App)
{
    let title = match app.workspace.path() {
        Some(path) => format!("Dwarview - {}", path.display()),
        None if app.session().is_some() => "Dwarview".to_string(),
        None => "Dwarview - No image loaded".to_string(),
    };

    let header = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL).title("Dwarview"))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    frame.render_widget(header, area);
}

fn draw_main_content(frame: &mut Frame, area: Rect, app: &mut App)
{
    let columns = Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).split(area);
    let right = Layout::vertical([Constraint::Percentage(60), Constraint::Percentage(40)]).split(columns[1]);

    crate::widgets::draw_tree(frame, columns[0], app);
    crate::widgets::draw_attributes(frame, right[0], app);
    crate::widgets::draw_results(frame, right[1], app);
}

/// Draw the footer: build and search status, key help, last error
fn draw_footer(frame: &mut Frame, area: Rect, app: &App)
{
    let help_text = if app.prompt.is_some() {
        "Enter:Search | Tab:Scope | Ctrl-D:Declarations | Ctrl-U:Clear | Esc:Close"
    } else {
        match app.focus {
            Focus::Tree => "↑/↓:Navigate | ←/→:Collapse/Expand | Enter:Show | /:Search | Tab:Pane | q:Quit",
            Focus::Attributes => "↑/↓:Navigate | Enter:Follow reference | /:Search | Tab:Pane | q:Quit",
            Focus::Results => "↑/↓:Navigate | Enter:Jump | x:Clear | Esc:Cancel search | Tab:Pane | q:Quit",
        }
    };

    let mut status = Vec::new();
    if let Some(session) = app.session() {
        for (label, context) in [("Build: ", StatusContext::Build), ("Search: ", StatusContext::Search)] {
            if let Some(message) = session.status().get(context) {
                status.push(Span::styled(label, Style::default().fg(Color::Yellow)));
                status.push(Span::raw(format!("{message}  ")));
            }
        }
    }

    let mut lines = vec![Line::from(status), Line::from(help_text)];
    if let Some(error) = &app.error_message {
        lines.push(Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        )));
    }

    let footer = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, area);
}
