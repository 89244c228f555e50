//! # dwarview-ui
//!
//! Terminal browser for Dwarview.
//!
//! This crate renders an open [`Workspace`] with `ratatui`: the record tree on
//! the left, the attribute table of the selected record and the search results
//! on the right, and build/search progress in the footer. The event loop keeps
//! stepping the session between key presses, so the tree fills in and searches
//! progress while the interface stays responsive.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dwarview_core::demangle::DemanglerKind;
//! use dwarview_core::{SessionOptions, Workspace};
//! use dwarview_ui::run_browser;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workspace = Workspace::new(SessionOptions::default(), DemanglerKind::Builtin);
//! workspace.open(std::path::Path::new("./target/debug/app"))?;
//!
//! run_browser(workspace).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod event;
pub mod tui;
pub mod ui;
pub mod widgets;

pub use app::App;
use dwarview_core::Workspace;
pub use tui::Tui;

/// Run the terminal browser until the user quits
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up, drawn or restored.
pub async fn run_browser(workspace: Workspace) -> std::io::Result<()>
{
    let mut tui = Tui::new()?;
    tui.run(workspace).await
}
