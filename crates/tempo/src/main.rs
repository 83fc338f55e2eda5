//! tempo - MIR closure conversion tool
//!
//! CLI driver that loads a serialized MIR unit, runs the closure conversion
//! pass on it and prints the result.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Closure conversion for tempo MIR
#[derive(Parser, Debug)]
#[command(name = "tempo")]
#[command(author, version, about = "Closure-convert and hoist tempo MIR units")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run closure conversion and hoisting on a MIR unit
    Convert(commands::convert::ConvertArgs),

    /// Render a MIR unit without transforming it
    Dump(commands::dump::DumpArgs),
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level(cli.verbose, cli.quiet)),
    )
    .init();

    match cli.command {
        Commands::Convert(args) => commands::convert::run(args, cli.format, cli.quiet),
        Commands::Dump(args) => commands::dump::run(args, cli.format),
    }
}
