//! # dwarview-core
//!
//! The engine behind Dwarview: reads the DWARF debug information of a
//! compiled program and turns it into a browsable, searchable tree.
//!
//! This crate provides:
//! - An accessor boundary over parsed debug info ([`source`]), with a
//!   `gimli`-backed reader for object files and an in-memory tree for tests
//! - Attribute decoding, including a location-expression disassembler
//!   ([`decode`])
//! - Display-name resolution through origin/specification chains ([`names`])
//! - An incremental tree builder that fills an offset index and searchable
//!   name lists ([`builder`], [`index`], [`tree`])
//! - A batched, cancelable glob search over those names ([`search`])
//!
//! ## Scheduling
//!
//! Nothing in here spawns threads or blocks. Building and searching are state
//! machines advanced one bounded step at a time by the host through
//! [`Session::step`], so an interactive front end stays responsive on large
//! images.
//!
//! ## Example
//!
//! ```rust
//! use dwarview_core::demangle::BuiltinDemangler;
//! use dwarview_core::search::{SearchRequest, SearchScope};
//! use dwarview_core::source::{MemoryImage, RawAttribute};
//! use dwarview_core::{Session, SessionOptions};
//! use gimli::constants;
//!
//! let mut image = MemoryImage::new();
//! let unit = image.add_unit("main.c", "/src", &["/src/main.c"]);
//! image.add_child(unit, constants::DW_TAG_subprogram, vec![RawAttribute::string(
//!     constants::DW_AT_name,
//!     "main",
//! )]);
//!
//! let mut session = Session::new(Box::new(image), Box::new(BuiltinDemangler), SessionOptions::default());
//! session.run_to_idle();
//! session.start_search(SearchRequest::new("ma*", SearchScope::Functions)).unwrap();
//! session.run_to_idle();
//! assert_eq!(session.search_results()[0].name, "main");
//! ```

pub mod builder;
pub mod decode;
pub mod demangle;
pub mod error;
pub mod index;
pub mod names;
pub mod search;
pub mod session;
pub mod source;
pub mod tables;
pub mod tree;

// Re-export commonly used types
pub use error::{DwarviewError, Result};
pub use session::{Activity, Session, SessionOptions, StatusContext, Workspace};
