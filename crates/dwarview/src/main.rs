use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use dwarview_core::decode::ValueDecoder;
use dwarview_core::demangle::DemanglerKind;
use dwarview_core::search::{SearchRequest, SearchScope};
use dwarview_core::tree::RowId;
use dwarview_core::{DwarviewError, Session, SessionOptions, Workspace};
use dwarview_utils::{info, init_logging, init_logging_for_tui, init_logging_with_level, LogFormat, LogLevel};

/// Browse the DWARF debug information of compiled programs.
#[derive(Parser, Debug)]
#[command(name = "dwarview")]
#[command(version)]
#[command(about = "Browse the DWARF debug information of compiled programs", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Symbol demangler for linkage names
    #[arg(long, global = true, value_enum, default_value_t = DemanglerArg::Builtin)]
    demangler: DemanglerArg,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Open the interactive browser
    Browse
    {
        /// Object file with debug information
        file: PathBuf,
    },
    /// Print the record tree
    Tree
    {
        /// Object file with debug information
        file: PathBuf,
        /// Deepest level to print (units are level 0)
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Print the decoded attributes of one record
    Attrs
    {
        /// Object file with debug information
        file: PathBuf,
        /// `.debug_info` offset of the record (hex format: 0x2d or decimal)
        #[arg(value_parser = parse_offset)]
        offset: u64,
    },
    /// Search function and variable names with a glob pattern
    Search
    {
        /// Object file with debug information
        file: PathBuf,
        /// Glob pattern matched against the whole name (`*`, `?`, `[...]`)
        pattern: String,
        /// Name lists to search
        #[arg(long, value_enum, default_value_t = ScopeArg::Both)]
        scope: ScopeArg,
        /// Also report declarations
        #[arg(long, default_value_t = false)]
        include_declarations: bool,
    },
    /// Show unit, record and name counts
    Info
    {
        /// Object file with debug information
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DemanglerArg
{
    Builtin,
    #[value(name = "c++filt")]
    CxxFilt,
    None,
}

impl From<DemanglerArg> for DemanglerKind
{
    fn from(arg: DemanglerArg) -> Self
    {
        match arg {
            DemanglerArg::Builtin => DemanglerKind::Builtin,
            DemanglerArg::CxxFilt => DemanglerKind::CxxFilt,
            DemanglerArg::None => DemanglerKind::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ScopeArg
{
    Functions,
    Variables,
    Both,
}

impl From<ScopeArg> for SearchScope
{
    fn from(arg: ScopeArg) -> Self
    {
        match arg {
            ScopeArg::Functions => SearchScope::Functions,
            ScopeArg::Variables => SearchScope::Variables,
            ScopeArg::Both => SearchScope::Both,
        }
    }
}

/// Parse a record offset given as `0x` hex or decimal.
fn parse_offset(text: &str) -> dwarview_core::Result<u64>
{
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| DwarviewError::InvalidArgument(format!("'{text}' is not an offset")))
}

fn main()
{
    let cli = Cli::parse();

    if let Commands::Browse { file } = &cli.command {
        // the browser owns the terminal, so it logs to a file only
        let _guard = match init_logging_for_tui(cli.log_level) {
            Ok((log_file, guard)) => {
                info!("Logging to {}", log_file.display());
                Some(guard)
            }
            Err(e) => {
                eprintln!("Failed to initialize logging: {e}");
                None
            }
        };
        if let Err(e) = browse(file, cli.demangler.into()) {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        return;
    }

    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::Pretty),
        None => init_logging(),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn browse(file: &Path, demangler: DemanglerKind) -> Result<(), Box<dyn Error>>
{
    let mut workspace = Workspace::new(SessionOptions::default(), demangler);
    workspace.open(file)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dwarview_ui::run_browser(workspace))?;
    Ok(())
}

fn run_command(cli: Cli) -> Result<(), Box<dyn Error>>
{
    let demangler = DemanglerKind::from(cli.demangler);
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Browse { .. } => Err(DwarviewError::InvalidArgument("browse is interactive".to_string()).into()),
        Commands::Tree { file, max_depth } => {
            let session = load(&file, demangler)?;
            print_tree(&mut out, &session, max_depth)?;
            Ok(())
        }
        Commands::Attrs { file, offset } => {
            let session = open(&file, demangler)?;
            let record = session
                .source()
                .record(offset)
                .ok_or_else(|| DwarviewError::InvalidArgument(format!("no record at offset {offset:#x}")))?;
            let names = session.resolver();
            writeln!(out, "<{offset:#x}> {}", names.resolve(&record))?;
            for attribute in ValueDecoder::new(&names).decode_all(&record) {
                writeln!(
                    out,
                    "  {:<24} {:<16} {:<#12x} {}",
                    attribute.attr, attribute.form, attribute.value, attribute.text
                )?;
            }
            Ok(())
        }
        Commands::Search {
            file,
            pattern,
            scope,
            include_declarations,
        } => {
            let mut session = load(&file, demangler)?;
            info!("Searching {} for '{}'", file.display(), pattern);
            session.start_search(SearchRequest::new(pattern, scope.into()).with_declarations(include_declarations))?;
            session.run_to_idle();
            for hit in session.search_results() {
                writeln!(out, "{}\t{}", hit.name, hit.location)?;
            }
            writeln!(out, "{}", session.search_status())?;
            Ok(())
        }
        Commands::Info { file } => {
            let session = load(&file, demangler)?;
            let progress = session.build_progress();
            let index = session.index();
            writeln!(out, "File: {}", file.display())?;
            writeln!(out, "  Address size: {}", session.source().address_size())?;
            writeln!(out, "  Units: {}", progress.units)?;
            writeln!(out, "  Records: {}", progress.records)?;
            writeln!(out, "  Functions: {}", index.functions.len())?;
            writeln!(out, "  Variables: {}", index.variables.len())?;
            Ok(())
        }
    }
}

fn open(file: &Path, demangler: DemanglerKind) -> dwarview_core::Result<Session>
{
    let mut workspace = Workspace::new(SessionOptions::default(), demangler);
    workspace.open(file)?;
    workspace
        .take_session()
        .ok_or_else(|| DwarviewError::InvalidArgument(format!("{} did not open", file.display())))
}

/// Open `file` and build its whole tree.
fn load(file: &Path, demangler: DemanglerKind) -> dwarview_core::Result<Session>
{
    let mut session = open(file, demangler)?;
    session.run_to_idle();
    Ok(session)
}

fn print_tree(out: &mut impl Write, session: &Session, max_depth: Option<usize>) -> io::Result<()>
{
    let tree = session.tree();
    let mut stack: Vec<(RowId, usize)> = tree.roots().iter().rev().map(|row| (*row, 0)).collect();
    while let Some((row, depth)) = stack.pop() {
        let Some(data) = tree.data(row) else {
            continue;
        };
        let offset = data.offset.map_or_else(String::new, |offset| format!("<{offset:#x}> "));
        writeln!(out, "{}{offset}{} {}", "  ".repeat(depth), data.label, data.display_name())?;

        if !max_depth.is_some_and(|max| depth >= max) {
            stack.extend(tree.children(row).iter().rev().map(|child| (*child, depth + 1)));
        }
    }
    Ok(())
}
