use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use dasm_analyzer::{
    config::AnalyzerConfig,
    diagnostics::Diagnostic,
    instrumentation,
    program::{FsFileProvider, Uri},
    workspace::Workspace,
};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[clap(long)]
    #[clap(help = "Enable chrome tracing")]
    #[clap(long_help = "Enable chrome tracing which on program exit will generate
a json file to be opened with a chrome tracing compatible
viewer.")]
    trace: bool,
    #[clap(short, long, action = clap::ArgAction::Count)]
    #[clap(help = "Log to stderr, repeat for more detail")]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[clap(about = "Report diagnostics for source files")]
    #[clap(aliases = &["c"])]
    Check(CheckArgs),
    #[clap(about = "List labels, macros and segments of a program")]
    #[clap(aliases = &["s", "sym"])]
    Symbols(SymbolsArgs),
}

#[derive(Args)]
struct CheckArgs {
    #[clap(long = "local-prefix", value_name = "PREFIX")]
    #[clap(help = "Treat labels starting with PREFIX as local, e.g. '.'")]
    local_prefixes: Vec<String>,
    #[clap(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct SymbolsArgs {
    #[clap(long = "local-prefix", value_name = "PREFIX")]
    local_prefixes: Vec<String>,
    file: PathBuf,
}

fn file_uri(path: &Path) -> Result<Uri> {
    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("Unable to find {}", path.display()))?;
    Uri::from_file_path(&absolute)
        .with_context(|| format!("Unable to address {}", absolute.display()))
}

fn describe(diagnostic: &Diagnostic) -> String {
    let location = &diagnostic.location;
    let path = location
        .uri
        .to_file_path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| location.uri.to_string());
    format!(
        "{}:{}: {}: {}",
        path, location.span.start, diagnostic.severity, diagnostic.message
    )
}

fn check(args: &CheckArgs) -> Result<()> {
    let config = AnalyzerConfig::with_local_prefixes(args.local_prefixes.iter().cloned());
    let workspace = Workspace::new(config, FsFileProvider);

    let mut errors = 0;
    for path in &args.files {
        let uri = file_uri(path)?;
        let analysis = workspace
            .analyze(&uri)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        for diagnostic in &analysis.diagnostics {
            println!("{}", describe(diagnostic));
        }
        errors += analysis
            .diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.is_error())
            .count();
    }

    if errors > 0 {
        bail!("{} error(s) found", errors);
    }
    Ok(())
}

fn symbols(args: &SymbolsArgs) -> Result<()> {
    let config = AnalyzerConfig::with_local_prefixes(args.local_prefixes.iter().cloned());
    let workspace = Workspace::new(config, FsFileProvider);
    let uri = file_uri(&args.file)?;
    let analysis = workspace
        .analyze(&uri)
        .with_context(|| format!("Unable to read {}", args.file.display()))?;
    let program = &analysis.program;

    for label in program.all_labels() {
        let kind = match (label.defined_as_constant, label.defined_as_variable) {
            (true, _) => "constant",
            (false, true) => "variable",
            (false, false) => "label",
        };
        let defined = label
            .definitions
            .first()
            .map(|location| format!("{}:{}", location.uri.file_name(), location.span.start))
            .unwrap_or_else(|| "undefined".to_string());
        println!("{:<8} {:<24} {} ({} uses)", kind, label.name, defined, label.usages.len());
    }
    for definition in program.macros().filter(|definition| !definition.definitions.is_empty()) {
        println!("{:<8} {:<24} ({} uses)", "macro", definition.name, definition.usages.len());
    }
    for segment in program.segments() {
        println!("{:<8} {}", "segment", segment.name);
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _trace_guard = instrumentation::init(cli.trace, cli.verbose);

    match &cli.command {
        Command::Check(args) => check(args),
        Command::Symbols(args) => symbols(args),
    }
}
