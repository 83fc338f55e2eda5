//! Display implementations for MIR
//!
//! Renders blocks as a `label:` header followed by one line per instruction.
//! Blocks owned by an instruction are indented one level deeper than the
//! instruction itself. Only meant for debugging and snapshot tests.

use crate::ir::*;
use std::fmt::{self, Display, Formatter};

const INDENT: &str = "  ";

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Name(name) => write!(f, "{}", name),
            Operand::Captured { name, block } => write!(f, "fv_{}_{}", name, block),
        }
    }
}

impl Display for CallKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Direct => write!(f, "app"),
            CallKind::Indirect => write!(f, "appcls"),
        }
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_block(f, self, 0)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_instruction(f, self, 0)
    }
}

fn indent(f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn join<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " , ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_block(f: &mut Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
    indent(f, depth)?;
    writeln!(f, "{}:", block.label)?;
    for inst in &block.instructions {
        write_instruction(f, inst, depth + 1)?;
    }
    Ok(())
}

/// Write one instruction starting at `depth`, terminated by a newline.
/// Nested blocks follow on their own lines.
fn write_instruction(f: &mut Formatter<'_>, inst: &Instruction, depth: usize) -> fmt::Result {
    indent(f, depth)?;
    let lv = &inst.lv_name;
    match &inst.kind {
        InstKind::Number { value } => writeln!(f, "{} = {}", lv, value),
        InstKind::Alloca => writeln!(f, "alloca: {} ({})", lv, inst.ty),
        InstKind::Ref { val } => writeln!(f, "{} = ref {}", lv, val),
        InstKind::Assign { val } => writeln!(f, "{} =(overwrite) {}", lv, val),
        InstKind::Time { val, time } => writeln!(f, "{} = {}@{}", lv, val, time),
        InstKind::Op { lhs, op, rhs } => writeln!(f, "{} = {} {} {}", lv, lhs, op, rhs),
        InstKind::Fun(fun) => {
            write!(f, "{} = fun", lv)?;
            if fun.is_recursive {
                write!(f, "[rec]")?;
            }
            if !fun.args.is_empty() {
                write!(f, " ")?;
                join(f, &fun.args)?;
            }
            if !fun.free_variables.is_empty() {
                write!(f, " fv{{ ")?;
                join(f, &fun.free_variables)?;
                write!(f, " }}")?;
            }
            writeln!(f)?;
            write_block(f, &fun.body, depth + 1)
        }
        InstKind::MakeClosure { fname, captures, .. } => {
            write!(f, "{} = makeclosure {}", lv, fname)?;
            if !captures.is_empty() {
                write!(f, " ")?;
                join(f, captures)?;
            }
            writeln!(f)
        }
        InstKind::Fcall {
            fname,
            args,
            call_kind,
        } => {
            write!(f, "{} = {} {}", lv, call_kind, fname)?;
            if !args.is_empty() {
                write!(f, " ")?;
                join(f, args)?;
            }
            writeln!(f)
        }
        InstKind::Array { name, args } => {
            write!(f, "{} = array {}", lv, name)?;
            if !args.is_empty() {
                write!(f, " ")?;
                join(f, args)?;
            }
            writeln!(f)
        }
        InstKind::ArrayAccess { name, index } => {
            writeln!(f, "{} = arrayaccess {} {}", lv, name, index)
        }
        InstKind::If {
            cond,
            then_block,
            else_block,
        } => {
            writeln!(f, "{} = if {}", lv, cond)?;
            write_block(f, then_block, depth + 1)?;
            write_block(f, else_block, depth + 1)
        }
        InstKind::Return { val } => writeln!(f, "{} = return {}", lv, val),
    }
}
