//! Convert command - closure-converts and hoists a MIR unit

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tempo_mir::MirUnit;
use tempo_transform::{convert_closures_with, ClosureOptions, ConversionSummary, HoistOrder};

use super::{load_unit, render_unit};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input MIR unit (JSON)
    pub input: PathBuf,

    /// Order lifted functions are placed in at the top level
    #[arg(long, value_enum, default_value = "prepend")]
    pub hoist_order: HoistOrderArg,

    /// Convert closures but leave nested functions where they are
    #[arg(long)]
    pub no_hoist: bool,

    /// Print the MIR before conversion as well (for debugging)
    #[arg(long)]
    pub print_input: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum HoistOrderArg {
    /// Reverse discovery order (each lifted function is prepended)
    #[default]
    Prepend,
    /// Discovery order, innermost functions first
    Discovery,
}

impl From<HoistOrderArg> for HoistOrder {
    fn from(arg: HoistOrderArg) -> Self {
        match arg {
            HoistOrderArg::Prepend => HoistOrder::Prepend,
            HoistOrderArg::Discovery => HoistOrder::Discovery,
        }
    }
}

impl ConvertArgs {
    fn options(&self) -> ClosureOptions {
        ClosureOptions {
            hoist_order: self.hoist_order.into(),
            hoist: !self.no_hoist,
        }
    }
}

/// Run the pass on an already loaded unit
pub fn convert_unit(unit: &mut MirUnit, options: &ClosureOptions) -> Result<ConversionSummary> {
    let summary = convert_closures_with(&mut unit.toplevel, &unit.types, options)
        .with_context(|| format!("closure conversion failed in `{}`", unit.toplevel.label))?;

    log::info!(
        "{} known function(s), {} closure(s), {} hoisted",
        summary.known_functions.len(),
        summary.closures.len(),
        summary.hoisted.len()
    );
    log::debug!("known functions: {:?}", summary.known_functions);
    log::debug!("closures: {:?}", summary.closures);
    Ok(summary)
}

pub fn run(args: ConvertArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let mut unit = load_unit(&args.input)?;

    if args.print_input && !quiet {
        println!("=== MIR (input): {} ===", args.input.display());
        print!("{}", unit.toplevel);
        println!("\n=== MIR (closure converted) ===");
    }

    convert_unit(&mut unit, &args.options())?;
    print!("{}", render_unit(&unit, format)?);
    Ok(())
}
