//! Terminal User Interface initialization and management

use std::io::{self, Stdout};
use std::panic;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use dwarview_core::{Activity, Workspace};
use dwarview_utils::info;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::app::App;
use crate::event::{Event, EventHandler};

/// Input wait while the session has work queued.
const BUSY_POLL: Duration = Duration::from_millis(1);
/// Input wait while the session is idle.
const IDLE_POLL: Duration = Duration::from_millis(100);
const TICK_RATE: Duration = Duration::from_millis(250);

/// Terminal browser for one workspace
///
/// Owns the terminal while running: raw mode plus the alternate screen.
pub struct Tui
{
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui
{
    /// Create a new TUI instance
    ///
    /// Enables raw mode and the alternate screen, and installs a panic hook
    /// that restores the terminal first.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization fails (raw mode, alternate screen, etc.)
    pub fn new() -> io::Result<Self>
    {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = Self::restore();
            original_hook(panic_info);
        }));

        Ok(Self { terminal })
    }

    /// Run the TUI event loop
    ///
    /// Every iteration performs one session step, redraws, then waits for
    /// input: briefly while the session is busy, longer once it is idle.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal drawing fails or terminal restoration fails
    pub async fn run(&mut self, workspace: Workspace) -> io::Result<()>
    {
        match workspace.path() {
            Some(path) => info!("Dwarview TUI started ({})", path.display()),
            None => info!("Dwarview TUI started"),
        }

        let mut app = App::new(workspace);
        let mut events = EventHandler::new(TICK_RATE);

        while !app.should_quit {
            let activity = app.step();
            self.terminal.draw(|frame| crate::ui::draw(frame, &mut app))?;

            let wait = match activity {
                Activity::Busy => BUSY_POLL,
                Activity::Idle => IDLE_POLL,
            };
            match tokio::time::timeout(wait, events.next()).await {
                Ok(Some(Event::Key(key_event))) => {
                    app.handle_key_event(key_event);
                }
                Ok(Some(Event::Resize | Event::Tick)) | Err(_) => {}
                // channel closed
                Ok(None) => break,
            }
        }

        events.stop();
        Self::restore()?;
        info!("Dwarview TUI closed");
        Ok(())
    }

    /// Restore the terminal to its original state
    ///
    /// # Errors
    ///
    /// Returns an error if terminal restoration fails (disabling raw mode, leaving alternate screen, etc.)
    pub fn restore() -> io::Result<()>
    {
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        Ok(())
    }
}

impl Drop for Tui
{
    fn drop(&mut self)
    {
        let _ = Self::restore();
    }
}
