//! MIR Transformations for tempo
//!
//! This crate contains the passes that turn nested, lexically scoped MIR
//! into flat top-level functions:
//! - Closure conversion
//! - Function hoisting

pub mod closure;
pub mod error;
pub mod hoist;
pub mod scope;

// Re-export main transformation functions
pub use closure::ClosureConverter;
pub use error::{ClosureError, Result};
pub use hoist::{move_functions_to_top, HoistOrder};
pub use scope::{ScopeId, SymbolEnv, VarCategory};

use tempo_mir::Block;
use tempo_types::TypeEnv;

/// Options for [`convert_closures_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureOptions {
    /// Order lifted functions are placed in at the top level
    pub hoist_order: HoistOrder,
    /// Lift nested functions after conversion
    pub hoist: bool,
}

impl Default for ClosureOptions {
    fn default() -> Self {
        Self {
            hoist_order: HoistOrder::default(),
            hoist: true,
        }
    }
}

/// What one run of the pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Capture-free functions, sorted by name
    pub known_functions: Vec<String>,
    /// Functions that received a capture record, inner functions first
    pub closures: Vec<String>,
    /// Lifted functions in their final top-level order
    pub hoisted: Vec<String>,
}

/// Convert closures in a compilation unit and hoist nested functions,
/// using the default options.
pub fn convert_closures(toplevel: &mut Block, type_env: &TypeEnv) -> Result<ConversionSummary> {
    convert_closures_with(toplevel, type_env, &ClosureOptions::default())
}

/// Convert closures in a compilation unit, mutating `toplevel` in place.
pub fn convert_closures_with(
    toplevel: &mut Block,
    type_env: &TypeEnv,
    options: &ClosureOptions,
) -> Result<ConversionSummary> {
    let mut converter = ClosureConverter::new(type_env);
    converter.convert_toplevel(toplevel)?;

    let hoisted = if options.hoist {
        move_functions_to_top(toplevel, options.hoist_order)
    } else {
        Vec::new()
    };

    Ok(ConversionSummary {
        known_functions: converter.known_functions(),
        closures: converter.closures().to_vec(),
        hoisted,
    })
}
