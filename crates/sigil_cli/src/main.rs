//! Sigil CLI: ABI fingerprints of compile classpath entries.
//!
//! Provides `sigil snapshot` to fingerprint classpath directories, `sigil abi`
//! to inspect the extracted interface of one class file, and `sigil cache` to
//! inspect or clear the persistent signature cache.

#![warn(missing_docs)]

mod abi;
mod cache;
mod context;
mod logging;
mod snapshot;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use sigil_config::OutputFormat;

/// Sigil: ABI-aware change detection for compile classpaths.
#[derive(Parser, Debug)]
#[command(name = "sigil", version, about = "ABI-aware classpath change detection")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `sigil.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fingerprint classpath entries by the ABI of their classes.
    Snapshot(SnapshotArgs),
    /// Show the extracted ABI of a single class file.
    Abi(AbiArgs),
    /// Inspect or clear the persistent signature cache.
    Cache(CacheArgs),
}

/// Arguments for the `sigil snapshot` subcommand.
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Classpath directories (or single class files) to fingerprint.
    #[arg(required = true)]
    pub entries: Vec<PathBuf>,

    /// Signature cache directory (overrides `cache.dir`).
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Do not read or write the persistent signature cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Output format (overrides `output.format`).
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Arguments for the `sigil abi` subcommand.
#[derive(Parser, Debug)]
pub struct AbiArgs {
    /// The class file to inspect.
    pub class_file: PathBuf,

    /// Output format (overrides `output.format`).
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Arguments for the `sigil cache` subcommand.
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// What to do with the cache.
    #[command(subcommand)]
    pub action: CacheAction,

    /// Signature cache directory (overrides `cache.dir`).
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

/// Cache maintenance actions.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Print the number of entries and their size on disk.
    Stats,
    /// Delete every entry.
    Clear,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Text => OutputFormat::Text,
            ReportFormat::Json => OutputFormat::Json,
        }
    }
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Snapshot(ref args) => snapshot::run(args, &global),
        Command::Abi(ref args) => abi::run(args, &global),
        Command::Cache(ref args) => cache::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
