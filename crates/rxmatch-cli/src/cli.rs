//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "rxmatch",
    version,
    about = "Map free-text treatment names to RxNorm and supplement identifiers",
    long_about = "Map free-text treatment names to canonical drug identifiers.\n\n\
                  Names are normalized, expanded into candidate keys and matched\n\
                  against RxNorm first, then the supplement catalogue."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (pretty for humans, json for machines).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// TOML configuration file (built-in defaults when omitted).
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Annotate a list of treatment names.
    Annotate(AnnotateArgs),

    /// Collapse brand-name identifiers onto their generic in a reference file.
    Unify(UnifyArgs),

    /// Report unification coverage and check well-known brand/generic pairs.
    Verify(VerifyArgs),

    /// Build the clinical reference file from an RxNorm RXNCONSO.RRF release.
    IngestRrf(IngestRrfArgs),

    /// Download the supplement catalogue from the configured API.
    FetchSupplements(FetchArgs),
}

#[derive(Parser)]
pub struct AnnotateArgs {
    /// Treatment names: a CSV table or a newline-delimited list.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Annotated CSV output.
    #[arg(short, long, value_name = "OUTPUT", default_value = "annotated_treatments.csv")]
    pub output: PathBuf,

    /// Also write a JSON run summary.
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,
}

#[derive(Parser)]
pub struct UnifyArgs {
    /// Reference CSV in canonical columns.
    #[arg(value_name = "REFERENCE")]
    pub reference: PathBuf,

    /// Output file (default: <REFERENCE stem>_unified.csv).
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Mapping table (`source_id,target_id,label`) replacing the built-in one.
    #[arg(long, value_name = "FILE")]
    pub mappings: Option<PathBuf>,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Reference CSV in canonical columns.
    #[arg(value_name = "REFERENCE")]
    pub reference: PathBuf,
}

#[derive(Parser)]
pub struct IngestRrfArgs {
    /// Path to RXNCONSO.RRF.
    #[arg(value_name = "RRF")]
    pub rrf: PathBuf,

    /// Reference CSV output.
    #[arg(short, long, value_name = "OUTPUT", default_value = "rxnorm_core_medications.csv")]
    pub output: PathBuf,

    /// Write curated records without brand→generic unification.
    #[arg(long = "skip-unify")]
    pub skip_unify: bool,
}

#[derive(Parser)]
pub struct FetchArgs {
    /// Supplement CSV output.
    #[arg(short, long, value_name = "OUTPUT", default_value = "supplements.csv")]
    pub output: PathBuf,

    /// Include inactive catalogue entries.
    #[arg(long)]
    pub all: bool,

    /// Stop after this many rows.
    #[arg(long = "max-rows", value_name = "N", default_value_t = 10_000)]
    pub max_rows: usize,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
