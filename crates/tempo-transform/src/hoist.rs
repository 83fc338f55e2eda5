//! Function hoisting
//!
//! After closure conversion no function body reads its enclosing scopes
//! implicitly any more, so nested definitions can be lifted out. Each nested
//! `fun` is removed from the block it was defined in and placed at the top
//! level; the block keeps the `makeclosure`/call sites that refer to it by
//! name.

use log::debug;
use tempo_mir::{Block, InstKind, Instruction};

/// Where lifted functions end up relative to each other.
///
/// Both policies place every lifted function before the instructions that
/// were already at the top level. Functions are discovered in post-order:
/// a function's own nested functions are discovered before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoistOrder {
    /// Each discovered function is put at the front of the top-level block,
    /// so the final order is the reverse of discovery.
    #[default]
    Prepend,
    /// Lifted functions keep their discovery order, innermost first.
    Discovery,
}

impl HoistOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoistOrder::Prepend => "prepend",
            HoistOrder::Discovery => "discovery",
        }
    }
}

/// Lift every function nested below the top level of `toplevel` and return
/// the lifted names in their final order.
///
/// Functions already at the top level stay where they are. Functions inside
/// `if` branches are lifted like those inside function bodies.
pub fn move_functions_to_top(toplevel: &mut Block, order: HoistOrder) -> Vec<String> {
    let mut lifted = Vec::new();
    for inst in &mut toplevel.instructions {
        lift_from_children(inst, &mut lifted);
    }
    if lifted.is_empty() {
        return Vec::new();
    }

    if order == HoistOrder::Prepend {
        lifted.reverse();
    }
    let names: Vec<String> = lifted
        .iter()
        .map(|f| f.lv_name.name().to_string())
        .collect();
    debug!(
        "hoisted {} function(s) to `{}` ({}): {}",
        names.len(),
        toplevel.label,
        order.as_str(),
        names.join(", ")
    );

    lifted.append(&mut toplevel.instructions);
    toplevel.instructions = lifted;
    names
}

/// Lift the functions nested in the blocks `inst` owns.
fn lift_from_children(inst: &mut Instruction, lifted: &mut Vec<Instruction>) {
    match &mut inst.kind {
        InstKind::Fun(fun) => lift_functions(&mut fun.body, lifted),
        InstKind::If {
            then_block,
            else_block,
            ..
        } => {
            lift_functions(then_block, lifted);
            lift_functions(else_block, lifted);
        }
        _ => {}
    }
}

/// Remove every function defined directly in `block`, after first lifting
/// the functions nested inside it, and append them to `lifted`.
fn lift_functions(block: &mut Block, lifted: &mut Vec<Instruction>) {
    let mut index = 0;
    while index < block.instructions.len() {
        lift_from_children(&mut block.instructions[index], lifted);
        if block.instructions[index].is_function() {
            if let Some(fun) = block.take(index) {
                debug!("lifting `{}` out of `{}`", fun.lv_name.name(), block.label);
                lifted.push(fun);
            }
        } else {
            index += 1;
        }
    }
}
