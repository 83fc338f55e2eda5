//! Errors raised by the closure conversion pass
//!
//! None of these are user errors: they mean an earlier stage handed over
//! malformed MIR. They carry enough context to find the failing instruction.

use tempo_mir::Instruction;
use tempo_types::Type;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClosureError>;

#[derive(Debug, Error)]
pub enum ClosureError {
    /// A captured name has no entry in the type environment
    #[error("no type recorded for captured name `{name}` in block `{block}`")]
    UnresolvedType { name: String, block: String },

    /// A function definition whose type is not a function type
    #[error("function `{name}` has non-function type `{ty}`")]
    NotAFunction { name: String, ty: Type },

    /// A call whose callee is not bound anywhere
    #[error("call to undeclared function `{callee}` in block `{block}`")]
    UnknownCallee { callee: String, block: String },

    /// Any of the above, tagged with the instruction that raised it
    #[error("while converting {kind} `{lv_name}` in block `{block}`: {source}")]
    Instruction {
        kind: &'static str,
        lv_name: String,
        block: String,
        #[source]
        source: Box<ClosureError>,
    },
}

impl ClosureError {
    /// Attach the failing instruction's context. An error that already
    /// names an instruction keeps the innermost one.
    pub(crate) fn within(self, inst: &Instruction, block: &str) -> Self {
        match self {
            ClosureError::Instruction { .. } => self,
            other => ClosureError::Instruction {
                kind: inst.kind_name(),
                lv_name: inst.lv_name.name().to_string(),
                block: block.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error without instruction context
    pub fn root_cause(&self) -> &ClosureError {
        match self {
            ClosureError::Instruction { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
