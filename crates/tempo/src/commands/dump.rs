//! Dump command - render a MIR unit as text or JSON

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::{load_unit, render_unit};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Input MIR unit (JSON)
    pub input: PathBuf,
}

pub fn run(args: DumpArgs, format: OutputFormat) -> Result<()> {
    let unit = load_unit(&args.input)?;
    log::debug!(
        "loaded `{}`: {} top-level instruction(s), {} typed name(s)",
        unit.toplevel.label,
        unit.toplevel.len(),
        unit.types.len()
    );
    print!("{}", render_unit(&unit, format)?);
    Ok(())
}
