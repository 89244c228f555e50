//! Linkage-name demangling.
//!
//! The name resolver falls back to a record's mangled linkage name when it has
//! no direct name. Whether that fallback is taken, and how the name is turned
//! back into source form, is decided by a [`Demangler`].
//!
//! ## Implementations
//!
//! - [`BuiltinDemangler`]: in-process. Rust symbols (legacy and v0) go through
//!   `rustc-demangle`; Itanium `_Z` names that are not Rust go through
//!   `cpp_demangle`. Anything else is returned unchanged.
//! - [`CxxFiltDemangler`]: a long-lived `c++filt` child process, one name per
//!   line over its stdin/stdout. Suited to C++ images.
//! - [`NoDemangler`]: reports itself unavailable, so the linkage-name branch is
//!   skipped entirely.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use cpp_demangle::{DemangleOptions, Symbol};
use rustc_demangle::try_demangle;
use tracing::{debug, warn};

/// Turns mangled linkage names into display names.
pub trait Demangler: Send
{
    /// Whether [`Demangler::demangle`] should be consulted at all.
    fn is_available(&self) -> bool;

    /// Demangle a linkage name. Names that cannot be demangled come back verbatim.
    fn demangle(&self, mangled: &str) -> String;
}

/// Selects a [`Demangler`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DemanglerKind
{
    #[default]
    Builtin,
    CxxFilt,
    None,
}

impl DemanglerKind
{
    /// Instantiate the selected demangler. `CxxFilt` spawns its process here.
    #[must_use]
    pub fn create(self) -> Box<dyn Demangler>
    {
        match self {
            DemanglerKind::Builtin => Box::new(BuiltinDemangler),
            DemanglerKind::CxxFilt => Box::new(CxxFiltDemangler::spawn()),
            DemanglerKind::None => Box::new(NoDemangler),
        }
    }
}

/// In-process demangler for Rust and Itanium C++ symbols.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDemangler;

impl BuiltinDemangler
{
    fn demangle_rust(mangled: &str) -> Option<String>
    {
        // `{:#}` leaves off the trailing hash of legacy symbols
        try_demangle(mangled).ok().map(|name| format!("{name:#}"))
    }

    fn demangle_cpp(mangled: &str) -> Option<String>
    {
        if !mangled.starts_with("_Z") {
            return None;
        }
        let symbol = Symbol::new(mangled).ok()?;
        symbol.demangle(&DemangleOptions::default()).ok()
    }
}

impl Demangler for BuiltinDemangler
{
    fn is_available(&self) -> bool
    {
        true
    }

    fn demangle(&self, mangled: &str) -> String
    {
        Self::demangle_rust(mangled)
            .or_else(|| Self::demangle_cpp(mangled))
            .unwrap_or_else(|| mangled.to_string())
    }
}

/// Demangler that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDemangler;

impl Demangler for NoDemangler
{
    fn is_available(&self) -> bool
    {
        false
    }

    fn demangle(&self, mangled: &str) -> String
    {
        mangled.to_string()
    }
}

struct FilterPipe
{
    child: Child,
    input: ChildStdin,
    output: BufReader<ChildStdout>,
}

impl FilterPipe
{
    fn round_trip(&mut self, mangled: &str) -> std::io::Result<String>
    {
        writeln!(self.input, "{mangled}")?;
        self.input.flush()?;

        let mut line = String::new();
        if self.output.read_line(&mut line)? == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "c++filt closed its output"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Drop for FilterPipe
{
    fn drop(&mut self)
    {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Demangler that talks to a `c++filt` child process.
///
/// The process is started once and kept for the lifetime of the demangler.
/// Any pipe failure shuts it down; from then on the demangler reports itself
/// unavailable and returns names unchanged.
pub struct CxxFiltDemangler
{
    pipe: Mutex<Option<FilterPipe>>,
}

impl CxxFiltDemangler
{
    /// Spawn `c++filt` from `PATH`.
    #[must_use]
    pub fn spawn() -> Self
    {
        Self::spawn_program("c++filt")
    }

    /// Spawn a specific filter program.
    ///
    /// Failure to start leaves the demangler unavailable rather than erroring.
    #[must_use]
    pub fn spawn_program(program: &str) -> Self
    {
        let pipe = match Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(mut child) => match (child.stdin.take(), child.stdout.take()) {
                (Some(input), Some(output)) => {
                    debug!(program, "demangler process started");
                    Some(FilterPipe {
                        child,
                        input,
                        output: BufReader::new(output),
                    })
                }
                _ => {
                    let _ = child.kill();
                    let _ = child.wait();
                    None
                }
            },
            Err(err) => {
                warn!(program, error = %err, "cannot start demangler");
                None
            }
        };

        Self { pipe: Mutex::new(pipe) }
    }
}

impl Demangler for CxxFiltDemangler
{
    fn is_available(&self) -> bool
    {
        self.pipe.lock().is_ok_and(|pipe| pipe.is_some())
    }

    fn demangle(&self, mangled: &str) -> String
    {
        let Ok(mut guard) = self.pipe.lock() else {
            return mangled.to_string();
        };
        let Some(pipe) = guard.as_mut() else {
            return mangled.to_string();
        };

        match pipe.round_trip(mangled) {
            Ok(name) => name,
            Err(err) => {
                warn!(error = %err, "demangler pipe failed, disabling");
                *guard = None;
                mangled.to_string()
            }
        }
    }
}

impl std::fmt::Debug for CxxFiltDemangler
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("CxxFiltDemangler")
            .field("available", &self.is_available())
            .finish()
    }
}
