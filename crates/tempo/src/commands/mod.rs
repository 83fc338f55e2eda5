//! CLI command implementations

pub mod convert;
pub mod dump;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tempo_mir::MirUnit;

/// Parse a MIR unit from its JSON form
pub fn parse_unit(source: &str) -> Result<MirUnit> {
    serde_json::from_str(source).context("invalid MIR unit")
}

/// Read and parse a MIR unit from disk
pub fn load_unit(path: &Path) -> Result<MirUnit> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_unit(&source).with_context(|| format!("while loading {}", path.display()))
}

/// Render a unit in the requested format
pub fn render_unit(unit: &MirUnit, format: crate::OutputFormat) -> Result<String> {
    match format {
        crate::OutputFormat::Text => Ok(unit.toplevel.to_string()),
        crate::OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(unit)?;
            json.push('\n');
            Ok(json)
        }
    }
}
