//! RxMatch CLI.

use clap::Parser;

mod cli;
mod commands;
mod logging;

use crate::cli::{Cli, Command, LogFormatArg};
use crate::commands::{
    load_config, run_annotate, run_fetch_supplements, run_ingest_rrf, run_unify, run_verify,
};
use crate::logging::{init_logging, LogConfig, LogFormat};

fn main() {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let log_config = LogConfig::from_flags(cli.verbose, cli.quiet).with_format(match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    });
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    if let Err(error) = run(&cli) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match &cli.command {
        Command::Annotate(args) => run_annotate(args, &config),
        Command::Unify(args) => run_unify(args, &config),
        Command::Verify(args) => run_verify(args),
        Command::IngestRrf(args) => run_ingest_rrf(args, &config),
        Command::FetchSupplements(args) => run_fetch_supplements(args),
    }
}
