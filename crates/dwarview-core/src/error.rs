//! # Error Types
//!
//! Errors surfaced to the host.
//!
//! Only a handful of operations can fail outright: opening an image, starting a
//! search and parsing user input. Everything that happens while a tree is being
//! built or an attribute is being decoded degrades to a placeholder string
//! instead, so batch work keeps making progress over damaged input.
//!
//! We use `thiserror` to derive the `Error` implementations.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Dwarview operations
///
/// ## Error Categories
///
/// 1. **Open errors**: Io, ObjectParse, NoDebugInfo, Dwarf
/// 2. **Search errors**: SearchBusy, InvalidPattern
/// 3. **Input errors**: InvalidArgument
#[derive(Error, Debug)]
pub enum DwarviewError
{
    /// Reading the image from disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not an object format we understand (ELF, Mach-O, PE, ...).
    #[error("Failed to parse {path}: {message}")]
    ObjectParse
    {
        /// Path of the image that failed to parse
        path: PathBuf,
        /// Parser diagnostic
        message: String,
    },

    /// The image parsed but carries no `.debug_info` units.
    ///
    /// This is the usual outcome for stripped binaries. Debug info split into a
    /// separate file has to be opened directly.
    #[error("{0}: no DWARF information")]
    NoDebugInfo(PathBuf),

    /// gimli rejected a section while the image was being opened.
    #[error("{context}: {message}")]
    Dwarf
    {
        /// What was being read when the error occurred
        context: String,
        /// gimli's diagnostic
        message: String,
    },

    /// A search is already running; it must be stopped before a new one starts.
    #[error("A search is already in progress")]
    SearchBusy,

    /// The search pattern could not be compiled.
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    /// Invalid argument passed to a Dwarview function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for `Result<T, DwarviewError>`
///
/// ```rust
/// use dwarview_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DwarviewError>;

/// Map a gimli error to a `DwarviewError` with context.
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> DwarviewError
{
    DwarviewError::Dwarf {
        context: context.to_string(),
        message: err.to_string(),
    }
}
